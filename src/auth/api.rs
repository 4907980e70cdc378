//! Authentication API Endpoints
//! Mission: Provide login, registration and profile endpoints

use crate::auth::{
    errors::AuthError,
    middleware::{authenticate, extract_claims, require_auth, AuthContext},
    models::{
        LoginRequest, LoginResponse, RegisterRequest, SessionResponse, UpdateProfileRequest,
        UserResponse,
    },
    service::AuthService,
};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

/// Shared auth state
pub type AuthState = Arc<AuthService>;

/// All auth routes, each group behind the gate it needs.
///
/// No group takes a minimum role. Accounts only ever manage themselves.
pub fn routes(service: AuthState) -> Router {
    let public = Router::new()
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .with_state(service.clone());

    // Token alone is enough
    let session = Router::new()
        .route("/api/auth/me", get(get_current_user))
        .route_layer(middleware::from_fn_with_state(
            require_auth(service.clone(), None),
            authenticate,
        ));

    let profile = Router::new()
        .route(
            "/api/users/me",
            get(get_profile).put(update_profile).delete(delete_account),
        )
        .route_layer(middleware::from_fn_with_state(
            require_auth(service.clone(), None).resolving_identity(),
            authenticate,
        ))
        .with_state(service);

    Router::new().merge(public).merge(session).merge(profile)
}

/// Registration endpoint - POST /api/register
pub async fn register(
    State(service): State<AuthState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AuthError> {
    let user = service.register(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Login endpoint - POST /api/login
pub async fn login(
    State(service): State<AuthState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    Ok(Json(service.login(payload).await?))
}

/// Get current user info - GET /api/auth/me
/// Built from the JWT claims alone (no database lookup)
pub async fn get_current_user(req: Request) -> Result<Json<SessionResponse>, AuthError> {
    let claims = extract_claims(&req).ok_or(AuthError::MissingToken)?;
    Ok(Json(SessionResponse::from_claims(claims)))
}

/// Get own profile - GET /api/users/me
pub async fn get_profile(ctx: AuthContext) -> Result<Json<UserResponse>, AuthError> {
    // Mounted behind a resolving gate, so the record is always loaded
    let user = ctx.identity.ok_or(AuthError::UnknownIdentity)?;
    Ok(Json(UserResponse::from_user(&user)))
}

/// Update own profile - PUT /api/users/me
pub async fn update_profile(
    State(service): State<AuthState>,
    ctx: AuthContext,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AuthError> {
    let user = service.update_profile(ctx.subject_id, payload).await?;
    Ok(Json(UserResponse::from_user(&user)))
}

/// Close own account - DELETE /api/users/me
pub async fn delete_account(
    State(service): State<AuthState>,
    ctx: AuthContext,
) -> Result<StatusCode, AuthError> {
    service.delete_account(ctx.subject_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
