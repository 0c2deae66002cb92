//! Standalone authentication server

use storefront_auth::{
    create_routes, sweeper, AuthConfig, AuthService, LogNotifier, MemoryStore, PgStore,
    RecordStore,
};

use sqlx::PgPool;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    Registry::default()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AuthConfig::from_env()?;

    let store: Arc<dyn RecordStore> = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = PgPool::connect(&database_url).await?;
            let store = PgStore::new(pool);
            store.migrate().await?;
            Arc::new(store)
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, identities are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let auth = Arc::new(AuthService::new(config, store, Arc::new(LogNotifier))?);
    sweeper::spawn(auth.clone());

    let app = create_routes(auth).layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Auth server listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
