//! Auth Service
//! Mission: Login, registration and identity resolution over a credential store

use crate::auth::{
    errors::{AuthError, FieldError},
    jwt::{Clock, SystemClock, TokenService},
    models::{
        Claims, LoginRequest, LoginResponse, ProfileUpdate, RegisterRequest, UpdateProfileRequest,
        User, UserResponse,
    },
    password::{PasswordHasher, MAX_PASSWORD_BYTES},
    roles::Role,
    user_store::{CredentialStore, StoreError},
};
use anyhow::Context;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 50;
const PASSWORD_MIN: usize = 6;

/// Everything the auth endpoints and the gate need, shared behind an `Arc`
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenService>,
    hasher: PasswordHasher,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
    // Verified against when the username is unknown, so both paths cost a bcrypt check
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: Arc<TokenService>,
        hasher: PasswordHasher,
    ) -> anyhow::Result<Self> {
        let dummy_hash = hasher
            .hash("dummy_startup_value")
            .context("Failed to precompute dummy password hash")?;

        Ok(Self {
            store,
            tokens,
            hasher,
            clock: Arc::new(SystemClock),
            store_timeout: DEFAULT_STORE_TIMEOUT,
            dummy_hash,
        })
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Clock used for `created_at` / `last_login` stamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Bound a store call by the configured deadline.
    ///
    /// Expiry only stops waiting. SQLite work already handed to the blocking
    /// pool still runs to completion, so a timed-out insert may commit and a
    /// retry of the same registration can then see `UsernameTaken`.
    async fn with_deadline<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.store_timeout, call)
            .await
            .map_err(|_| StoreError::Timeout)?
    }

    /// Verify credentials, stamp last login and issue a token.
    ///
    /// Unknown username and wrong password fail identically.
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, AuthError> {
        info!("🔐 Login attempt: {}", req.username);

        let mut fields = Vec::new();
        if req.username.trim().is_empty() {
            fields.push(FieldError::new("username", "is required"));
        }
        if req.password.is_empty() {
            fields.push(FieldError::new("password", "is required"));
        }
        if !fields.is_empty() {
            return Err(AuthError::Validation(fields));
        }

        let found = self
            .with_deadline(self.store.find_by_username(&req.username))
            .await?;

        let Some(mut user) = found else {
            let _ = self
                .hasher
                .verify_blocking(req.password, self.dummy_hash.clone())
                .await;
            warn!("❌ Failed login attempt: {}", req.username);
            return Err(AuthError::InvalidCredentials);
        };

        let valid = self
            .hasher
            .verify_blocking(req.password, user.password_hash.clone())
            .await?;
        if !valid {
            warn!("❌ Failed login attempt: {}", req.username);
            return Err(AuthError::InvalidCredentials);
        }

        let now = self.clock.now();
        self.with_deadline(self.store.update_last_login(user.id, now))
            .await?;
        user.last_login = Some(now);

        let issued = self
            .tokens
            .issue_token(&user)
            .context("Failed to generate JWT")?;

        info!("✅ Login successful: {} ({})", user.username, user.role);

        Ok(LoginResponse {
            access_token: issued.token,
            token_type: "Bearer",
            expires_in: issued.expires_in,
            user: UserResponse::from_user(&user),
        })
    }

    /// Create an account. The username is never overwritten.
    pub async fn register(&self, req: RegisterRequest) -> Result<UserResponse, AuthError> {
        let role = validate_registration(&req).map_err(AuthError::Validation)?;

        let password_hash = self.hasher.hash_blocking(req.password).await?;
        let user = User {
            id: Uuid::new_v4(),
            username: req.username,
            email: req.email.trim().to_string(),
            phone: req.phone.trim().to_string(),
            image: None,
            password_hash,
            role,
            created_at: self.clock.now(),
            last_login: None,
        };

        match self.with_deadline(self.store.insert(&user)).await {
            Ok(()) => {}
            Err(StoreError::Duplicate) => {
                warn!("Registration rejected, username taken: {}", user.username);
                return Err(AuthError::UsernameTaken);
            }
            Err(e) => return Err(e.into()),
        }

        info!("✅ Registered user: {} ({})", user.username, user.role);
        Ok(UserResponse::from_user(&user))
    }

    /// Load the current record for a verified token's subject
    pub async fn resolve_identity(&self, claims: &Claims) -> Result<User, AuthError> {
        self.with_deadline(self.store.find_by_id(claims.sub))
            .await?
            .ok_or(AuthError::UnknownIdentity)
    }

    pub async fn update_profile(
        &self,
        id: Uuid,
        req: UpdateProfileRequest,
    ) -> Result<User, AuthError> {
        let mut fields = Vec::new();
        if let Some(email) = req.email.as_deref() {
            if !looks_like_email(email.trim()) {
                fields.push(FieldError::new("email", "must be a valid email address"));
            }
        }
        if let Some(phone) = req.phone.as_deref() {
            if phone.trim().is_empty() {
                fields.push(FieldError::new("phone", "must not be empty"));
            }
        }
        if !fields.is_empty() {
            return Err(AuthError::Validation(fields));
        }

        let update = ProfileUpdate {
            email: req.email.map(|e| e.trim().to_string()),
            phone: req.phone.map(|p| p.trim().to_string()),
            image: req.image,
        };

        match self.with_deadline(self.store.update_profile(id, &update)).await {
            Ok(user) => Ok(user),
            Err(StoreError::NotFound) => Err(AuthError::UnknownIdentity),
            Err(e) => Err(e.into()),
        }
    }

    /// Close the caller's own account. Its outstanding tokens stop
    /// resolving immediately.
    pub async fn delete_account(&self, id: Uuid) -> Result<(), AuthError> {
        match self.with_deadline(self.store.delete(id)).await {
            Ok(()) => {
                info!("🗑️  Account closed: {}", id);
                Ok(())
            }
            Err(StoreError::NotFound) => Err(AuthError::UnknownIdentity),
            Err(e) => Err(e.into()),
        }
    }
}

fn validate_registration(req: &RegisterRequest) -> Result<Role, Vec<FieldError>> {
    let mut fields = Vec::new();

    let username_len = req.username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&username_len) {
        fields.push(FieldError::new(
            "username",
            format!(
                "must be between {} and {} characters",
                USERNAME_MIN, USERNAME_MAX
            ),
        ));
    } else if req.username.chars().any(char::is_whitespace) {
        fields.push(FieldError::new("username", "must not contain whitespace"));
    }

    if req.password.chars().count() < PASSWORD_MIN {
        fields.push(FieldError::new(
            "password",
            format!("must be at least {} characters", PASSWORD_MIN),
        ));
    } else if req.password.len() > MAX_PASSWORD_BYTES {
        fields.push(FieldError::new(
            "password",
            format!("must be at most {} bytes", MAX_PASSWORD_BYTES),
        ));
    }

    if !looks_like_email(req.email.trim()) {
        fields.push(FieldError::new("email", "must be a valid email address"));
    }

    if req.phone.trim().is_empty() {
        fields.push(FieldError::new("phone", "is required"));
    }

    let role = match req.role {
        None => {
            fields.push(FieldError::new("role", "is required"));
            None
        }
        Some(code) => {
            let role = Role::from_code(code);
            if role.is_none() {
                fields.push(FieldError::new("role", "must be 1 or 2"));
            }
            role
        }
    };

    match role {
        Some(role) if fields.is_empty() => Ok(role),
        _ => Err(fields),
    }
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}
