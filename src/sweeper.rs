//! Background Sweeper
//!
//! Periodically drops expired revocations, idle throttle windows and expired
//! reset tokens.

use crate::service::AuthService;

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Spawn the sweep loop on the current runtime.
///
/// The first sweep runs immediately, then every `sweep_interval` seconds.
pub fn spawn(auth_service: Arc<AuthService>) -> JoinHandle<()> {
    let period = Duration::from_secs(auth_service.config().sweep_interval);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match auth_service.sweep().await {
                Ok(report) => {
                    if report != Default::default() {
                        tracing::info!(
                            revocations = report.revocations,
                            rate_limit_keys = report.rate_limit_keys,
                            reset_tokens = report.reset_tokens,
                            "Expired auth state swept"
                        );
                    }
                }
                Err(e) => tracing::error!(error = %e, "Auth sweep failed"),
            }
        }
    })
}
