//! JWT Token Service
//! Mission: Issue and verify HS256 tokens securely

use crate::auth::models::{Claims, User};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use tracing::{debug, warn};

/// Lifetime of every issued token
pub const TOKEN_TTL_HOURS: i64 = 24;

const MIN_RECOMMENDED_SECRET_LEN: usize = 32;

/// Source of "now" for issuance and expiry checks
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("signing secret must not be empty")]
    EmptySecret,
    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
    /// Deliberately carries no cause: signature, format and expiry failures
    /// all look the same to the caller.
    #[error("invalid token")]
    Invalid,
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

/// JWT service for token operations
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    /// Create a token service backed by the system clock
    pub fn new(secret: &str) -> Result<Self, TokenError> {
        Self::with_clock(secret, Arc::new(SystemClock))
    }

    pub fn with_clock(secret: &str, clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        if secret.trim().is_empty() {
            return Err(TokenError::EmptySecret);
        }
        if secret.len() < MIN_RECOMMENDED_SECRET_LEN {
            warn!(
                "JWT secret is shorter than {} bytes; use a longer random value",
                MIN_RECOMMENDED_SECRET_LEN
            );
        }

        // Only HS256 is accepted. Expiry is checked against our own clock so
        // the boundary is exact (no leeway) and testable.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::hours(TOKEN_TTL_HOURS),
            clock,
        })
    }

    /// Seconds a new token stays valid
    pub fn expires_in(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Sign a token for a user
    pub fn issue_token(&self, user: &User) -> Result<IssuedToken, TokenError> {
        let now = self.clock.now().timestamp();
        let expires_at = now + self.expires_in();

        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role,
            email: Some(user.email.clone()).filter(|e| !e.is_empty()),
            phone: Some(user.phone.clone()).filter(|p| !p.is_empty()),
            iat: now,
            exp: expires_at,
        };

        debug!(
            "Generating JWT for user {} ({}), expires in {}h",
            user.username, user.id, TOKEN_TTL_HOURS
        );

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )
        .map_err(TokenError::Signing)?;

        Ok(IssuedToken {
            token,
            expires_in: self.expires_in(),
        })
    }

    /// Validate a token and extract claims.
    ///
    /// A token is accepted while `now < exp`; at exactly `exp` it is expired.
    pub fn verify_token(&self, token: &str) -> Result<Claims, TokenError> {
        let decoded = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            debug!("JWT rejected: {}", e);
            TokenError::Invalid
        })?;

        let claims = decoded.claims;
        let now = self.clock.now().timestamp();
        if now >= claims.exp {
            debug!("JWT for user {} expired at {}", claims.username, claims.exp);
            return Err(TokenError::Invalid);
        }

        debug!("Validated JWT for user {}", claims.username);

        Ok(claims)
    }
}
