//! Authentication Middleware
//! Mission: Protect API endpoints with JWT validation and role checks

use crate::auth::{
    errors::AuthError,
    models::{Claims, User},
    roles::Role,
    service::AuthService,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// What the gate learned about the caller, available to every handler behind it
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub subject_id: Uuid,
    pub username: String,
    pub role: Role,
    /// Present only when the gate was built with [`AuthGate::resolving_identity`]
    pub identity: Option<User>,
}

impl AuthContext {
    fn from_claims(claims: &Claims, identity: Option<User>) -> Self {
        Self {
            subject_id: claims.sub,
            username: claims.username.clone(),
            role: claims.role,
            identity,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Missing context means the route was mounted outside the gate: fail closed
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

/// Gate configuration for one group of routes
#[derive(Clone)]
pub struct AuthGate {
    service: Arc<AuthService>,
    min_role: Option<Role>,
    resolve_identity: bool,
}

/// Build a gate. `None` admits any authenticated caller.
pub fn require_auth(service: Arc<AuthService>, min_role: Option<Role>) -> AuthGate {
    AuthGate {
        service,
        min_role,
        resolve_identity: false,
    }
}

impl AuthGate {
    /// Also load the caller's current record, rejecting deleted accounts
    pub fn resolving_identity(mut self) -> Self {
        self.resolve_identity = true;
        self
    }

    /// Run the full check against request headers
    pub async fn check(&self, headers: &HeaderMap) -> Result<(Claims, AuthContext), AuthError> {
        let token = bearer_token(headers)?;

        let claims = self
            .service
            .tokens()
            .verify_token(token)
            .map_err(|_| AuthError::InvalidToken)?;

        let identity = if self.resolve_identity {
            Some(self.service.resolve_identity(&claims).await?)
        } else {
            None
        };

        // The token's role is authoritative, even when the record was loaded
        if let Some(required) = self.min_role {
            if !claims.role.satisfies(required) {
                return Err(AuthError::Forbidden);
            }
        }

        let context = AuthContext::from_claims(&claims, identity);
        Ok((claims, context))
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
///
/// The header must be exactly two space-separated parts, the first being
/// `Bearer`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let value = value.to_str().map_err(|_| AuthError::InvalidHeader)?;
    if value.is_empty() {
        return Err(AuthError::MissingToken);
    }

    let parts: Vec<&str> = value.split(' ').collect();
    match parts.as_slice() {
        ["Bearer", token] if !token.is_empty() => Ok(*token),
        _ => Err(AuthError::InvalidHeader),
    }
}

/// Auth middleware: validates the bearer token, then hands [`AuthContext`]
/// and [`Claims`] to the next layer via request extensions
pub async fn authenticate(
    State(gate): State<AuthGate>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let (claims, context) = match gate.check(req.headers()).await {
        Ok(found) => found,
        Err(err) => {
            warn!(
                method = %req.method(),
                path = %req.uri().path(),
                reason = %err,
                "authentication rejected"
            );
            return Err(err);
        }
    };

    debug!(
        user = %context.username,
        role = %context.role,
        "request authenticated"
    );

    req.extensions_mut().insert(claims);
    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}

/// Extract claims from request (use after auth middleware)
pub fn extract_claims(req: &Request) -> Option<&Claims> {
    req.extensions().get::<Claims>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        jwt::TokenService,
        models::{LoginRequest, RegisterRequest},
        password::PasswordHasher,
        user_store::{CredentialStore, MemoryUserStore},
    };
    use axum::{
        body::Body,
        http::{HeaderValue, Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    const SECRET: &str = "gate-test-secret-0123456789abcdef0123";

    async fn setup() -> (Arc<AuthService>, Arc<MemoryUserStore>) {
        let store = Arc::new(MemoryUserStore::new());
        let tokens = Arc::new(TokenService::new(SECRET).unwrap());
        let service =
            Arc::new(AuthService::new(store.clone(), tokens, PasswordHasher::new(4)).unwrap());
        (service, store)
    }

    async fn token_for(service: &AuthService, username: &str, role: i64) -> (Uuid, String) {
        let user = service
            .register(RegisterRequest {
                username: username.to_string(),
                password: "secret1".to_string(),
                email: format!("{}@x.com", username),
                phone: "555".to_string(),
                role: Some(role),
            })
            .await
            .unwrap();
        let response = service
            .login(LoginRequest {
                username: username.to_string(),
                password: "secret1".to_string(),
            })
            .await
            .unwrap();
        (user.id, response.access_token)
    }

    async fn whoami(ctx: AuthContext) -> String {
        format!(
            "{}:{}:{}",
            ctx.username,
            ctx.role.code(),
            ctx.identity.is_some()
        )
    }

    fn app(gate: AuthGate) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .route_layer(middleware::from_fn_with_state(gate, authenticate))
    }

    async fn call(app: Router, auth: Option<&str>) -> (StatusCode, String) {
        let mut builder = HttpRequest::builder().uri("/whoami");
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_format() {
        assert_eq!(bearer_token(&headers_with("Bearer abc")).unwrap(), "abc");

        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingToken)
        ));
        for bad in [
            "abc",
            "Bearer",
            "Bearer ",
            "bearer abc",
            "Basic abc",
            "Bearer abc def",
            "Bearer  abc",
            " Bearer abc",
        ] {
            assert!(
                matches!(bearer_token(&headers_with(bad)), Err(AuthError::InvalidHeader)),
                "accepted {:?}",
                bad
            );
        }
    }

    #[tokio::test]
    async fn test_claims_only_gate() {
        let (service, _) = setup().await;
        let (_, token) = token_for(&service, "alice", 2).await;

        let gate = require_auth(service, None);
        let (status, body) = call(app(gate), Some(&format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "alice:2:false");
    }

    #[tokio::test]
    async fn test_missing_and_malformed_headers_rejected() {
        let (service, _) = setup().await;
        let (_, token) = token_for(&service, "alice", 1).await;
        let gate = require_auth(service, None);

        let (status, _) = call(app(gate.clone()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(app(gate.clone()), Some(&token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(app(gate), Some("Bearer not.a.jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_min_role_enforced() {
        let (service, _) = setup().await;
        let (_, bfa_token) = token_for(&service, "alice", 1).await;
        let (_, staff_token) = token_for(&service, "bob", 2).await;
        let gate = require_auth(service, Some(Role::Bfa));

        let (status, _) = call(app(gate.clone()), Some(&format!("Bearer {}", bfa_token))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(app(gate), Some(&format!("Bearer {}", staff_token))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_resolving_gate_rejects_deleted_identity() {
        let (service, store) = setup().await;
        let (id, token) = token_for(&service, "alice", 1).await;
        let header = format!("Bearer {}", token);

        let resolving = require_auth(service.clone(), None).resolving_identity();
        let (status, body) = call(app(resolving.clone()), Some(&header)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "alice:1:true");

        store.delete(id).await.unwrap();

        let (status, _) = call(app(resolving), Some(&header)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // Claims-only gates never consult the store
        let (status, _) = call(app(require_auth(service, None)), Some(&header)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unauthenticated_before_forbidden() {
        let (service, _) = setup().await;
        let gate = require_auth(service, Some(Role::Bfa));

        let (status, _) = call(app(gate), Some("Bearer garbage")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_context_extractor_fails_closed_without_gate() {
        let app = Router::new().route("/whoami", get(whoami));
        let (status, _) = call(app, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_extract_claims_from_request() {
        let mut req = HttpRequest::new(Body::empty());
        assert!(extract_claims(&req).is_none());

        let claims = Claims {
            sub: Uuid::new_v4(),
            username: "test".to_string(),
            role: Role::Staff,
            email: None,
            phone: None,
            iat: 1234567000,
            exp: 1234567890,
        };
        req.extensions_mut().insert(claims);

        assert_eq!(extract_claims(&req).unwrap().username, "test");
    }
}
