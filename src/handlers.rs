//! Authentication HTTP Handlers
//!
//! REST API endpoints for authentication operations.

use crate::error::AuthError;
use crate::extractors::AuthUser;
use crate::middleware;
use crate::models::*;
use crate::service::AuthService;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Shared auth service state
pub type AuthState = Arc<AuthService>;

const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account with that email exists, a password reset link has been sent.";

fn validated<T: Validate>(req: T) -> Result<T, AuthError> {
    req.validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;
    Ok(req)
}

// ============================================
// Route Builder
// ============================================

/// Create authentication routes
pub fn create_routes(auth_service: AuthState) -> Router {
    // Login is throttled per client before credentials are checked
    let login_route = Router::new()
        .route("/auth/login", post(login))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_service.clone(),
            middleware::rate_limit_login,
        ));

    // Public routes (no authentication required)
    let public = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password));

    // Protected routes (require authentication)
    let protected = Router::new()
        .route("/auth/refresh", post(refresh_token))
        .route("/auth/logout", post(logout))
        .route("/auth/change-password", post(change_password))
        .route("/auth/me", get(get_current_user).put(update_current_user))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_service.clone(),
            middleware::require_auth,
        ));

    // Administration (superusers only)
    let admin = Router::new()
        .route("/users/:id", get(get_user))
        .route("/users/:id/active", put(set_user_active))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_service.clone(),
            middleware::require_admin,
        ));

    Router::new()
        .merge(login_route)
        .merge(public)
        .merge(protected)
        .merge(admin)
        .with_state(auth_service)
}

// ============================================
// Registration
// ============================================

/// POST /auth/register
pub async fn register(
    State(auth): State<AuthState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let identity = auth.register(validated(req)?).await?;

    Ok((StatusCode::CREATED, Json(IdentityResponse::from(identity))))
}

// ============================================
// Login / Logout
// ============================================

/// POST /auth/login
///
/// Authenticate and return an access/refresh pair
pub async fn login(
    State(auth): State<AuthState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let pair = auth.login(validated(req)?).await?;

    Ok(Json(TokenResponse::from(pair)))
}

/// POST /auth/logout
///
/// Revoke the bearer token and end refresh capability
pub async fn logout(
    State(auth): State<AuthState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AuthError> {
    auth.logout(&user.token).await?;

    Ok(Json(MessageResponse::new("Logged out successfully")))
}

// ============================================
// Token Refresh
// ============================================

/// POST /auth/refresh
pub async fn refresh_token(
    State(auth): State<AuthState>,
    user: AuthUser,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let req = validated(req)?;
    let pair = auth.refresh(&user.claims, &req.refresh_token).await?;

    Ok(Json(TokenResponse::from(pair)))
}

// ============================================
// Password Management
// ============================================

/// POST /auth/forgot-password
///
/// Unknown emails get the same message with a 404 status unless the
/// uniform response is configured.
pub async fn forgot_password(
    State(auth): State<AuthState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Response, AuthError> {
    let req = validated(req)?;

    match auth.forgot_password(&req.email).await {
        Ok(()) => Ok(Json(MessageResponse::new(FORGOT_PASSWORD_MESSAGE)).into_response()),
        Err(AuthError::NotFound) if auth.config().uniform_forgot_password_response => {
            Ok(Json(MessageResponse::new(FORGOT_PASSWORD_MESSAGE)).into_response())
        }
        Err(AuthError::NotFound) => Ok((
            StatusCode::NOT_FOUND,
            Json(MessageResponse::new(FORGOT_PASSWORD_MESSAGE)),
        )
            .into_response()),
        Err(e) => Err(e),
    }
}

/// POST /auth/reset-password
pub async fn reset_password(
    State(auth): State<AuthState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AuthError> {
    auth.reset_password(validated(req)?).await?;

    Ok(Json(MessageResponse::new(
        "Password reset successful. Please login with your new password.",
    )))
}

/// POST /auth/change-password
pub async fn change_password(
    State(auth): State<AuthState>,
    user: AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AuthError> {
    auth.change_password(&user.claims, validated(req)?).await?;

    Ok(Json(MessageResponse::new("Password changed successfully.")))
}

// ============================================
// User Profile
// ============================================

/// GET /auth/me
pub async fn get_current_user(
    State(auth): State<AuthState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AuthError> {
    let identity = auth.current_identity(&user.claims).await?;

    Ok(Json(IdentityResponse::from(identity)))
}

/// PUT /auth/me
pub async fn update_current_user(
    State(auth): State<AuthState>,
    user: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let identity = auth.update_profile(&user.claims, validated(req)?).await?;

    Ok(Json(IdentityResponse::from(identity)))
}

// ============================================
// Administration
// ============================================

/// GET /users/:id
pub async fn get_user(
    State(auth): State<AuthState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AuthError> {
    let identity = auth.get_identity(&user.claims, id).await?;

    Ok(Json(IdentityResponse::from(identity)))
}

/// PUT /users/:id/active
pub async fn set_user_active(
    State(auth): State<AuthState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<SetActiveRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let identity = auth.set_active(&user.claims, id, req.is_active).await?;

    Ok(Json(IdentityResponse::from(identity)))
}
