use anyhow::{Context, Result};
use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, ORIGIN},
        HeaderValue, Method,
    },
    middleware,
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use std::time::Duration;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer};

use crate::auth::{api as auth_api, AuthState};
use crate::middleware::request_logging;

/// Create the API router
pub fn create_router(auth: AuthState, cors_origin: Option<&str>) -> Result<Router> {
    let app = Router::new()
        .route("/health", get(health_check))
        .merge(auth_api::routes(auth))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(cors_origin)?)
        // A panicking handler becomes a 500, never a dropped connection
        .layer(CatchPanicLayer::new());

    Ok(app)
}

fn cors_layer(origin: Option<&str>) -> Result<CorsLayer> {
    let Some(origin) = origin else {
        return Ok(CorsLayer::permissive());
    };

    let origin: HeaderValue = origin
        .parse()
        .with_context(|| format!("Invalid CORS origin {:?}", origin))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([ORIGIN, CONTENT_LENGTH, CONTENT_TYPE, AUTHORIZATION])
        .expose_headers([CONTENT_LENGTH])
        .allow_credentials(true)
        .max_age(Duration::from_secs(12 * 3600)))
}

// ===== Route Handlers =====

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        password::PasswordHasher, user_store::MemoryUserStore, AuthService, TokenService,
    };
    use axum::{body::Body, http::Request, http::StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn auth_state() -> AuthState {
        let tokens = Arc::new(TokenService::new("routes-test-secret-0123456789abcdef").unwrap());
        Arc::new(
            AuthService::new(
                Arc::new(MemoryUserStore::new()),
                tokens,
                PasswordHasher::new(4),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = create_router(auth_state(), None).unwrap();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_restricted_cors_origin() {
        let app = create_router(auth_state(), Some("http://localhost:50574")).unwrap();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(ORIGIN, "http://localhost:50574")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:50574"
        );
    }

    #[test]
    fn test_invalid_cors_origin_rejected() {
        assert!(cors_layer(Some("bad\norigin")).is_err());
    }
}
