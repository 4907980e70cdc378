//! Process configuration
//!
//! Read once at startup (flags, environment, `.env`) and passed down
//! explicitly. Nothing reads the environment while serving requests.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Which credential store backs this deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

#[derive(Parser, Clone)]
#[command(name = "myactivity")]
#[command(about = "MyActivity API - authentication and access control")]
pub struct AppConfig {
    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: SocketAddr,

    /// HMAC secret for signing access tokens (required, no default)
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Credential store backend
    #[arg(long, env = "STORE_BACKEND", value_enum, default_value = "sqlite")]
    pub store_backend: StoreBackend,

    /// SQLite database path (sqlite backend only)
    #[arg(long, env = "AUTH_DB_PATH", default_value = "myactivity_auth.db")]
    pub auth_db_path: String,

    /// bcrypt work factor
    #[arg(long, env = "BCRYPT_COST", default_value_t = bcrypt::DEFAULT_COST)]
    pub bcrypt_cost: u32,

    /// Deadline for a single credential store call, in milliseconds
    #[arg(long, env = "STORE_TIMEOUT_MS", default_value = "5000")]
    pub store_timeout_ms: u64,

    /// Allowed CORS origin; permissive when unset
    #[arg(long, env = "CORS_ALLOWED_ORIGIN")]
    pub cors_origin: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set to a non-empty value")]
    MissingSecret,
    #[error("BCRYPT_COST must be between 4 and 31, got {0}")]
    BcryptCost(u32),
    #[error("STORE_TIMEOUT_MS must be greater than zero")]
    StoreTimeout,
    #[error("invalid CORS origin {0:?}")]
    CorsOrigin(String),
}

impl AppConfig {
    /// Load `.env` files, then parse flags and environment
    pub fn load() -> Self {
        load_env();
        Self::parse()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(ConfigError::BcryptCost(self.bcrypt_cost));
        }
        if self.store_timeout_ms == 0 {
            return Err(ConfigError::StoreTimeout);
        }
        if let Some(origin) = &self.cors_origin {
            if origin.parse::<axum::http::HeaderValue>().is_err() {
                return Err(ConfigError::CorsOrigin(origin.clone()));
            }
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

// Never print the secret
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"<redacted>")
            .field("store_backend", &self.store_backend)
            .field("auth_db_path", &self.auth_db_path)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("store_timeout_ms", &self.store_timeout_ms)
            .field("cors_origin", &self.cors_origin)
            .finish()
    }
}

fn load_env() {
    // 1) Standard dotenv search (cwd + parents)
    let _ = dotenv::dotenv();

    // 2) Also try the crate root (when run with --manifest-path from elsewhere)
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> AppConfig {
        let mut argv = vec!["myactivity"];
        argv.extend_from_slice(args);
        AppConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--jwt-secret", "a-long-enough-secret-value-0123456789"]);
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.store_backend, StoreBackend::Sqlite);
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert_eq!(config.store_timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_secret_fails_validation() {
        let config = parse(&["--jwt-secret", "   "]);
        assert_eq!(config.validate(), Err(ConfigError::MissingSecret));
    }

    #[test]
    fn test_other_invariants() {
        let config = parse(&["--jwt-secret", "s", "--bcrypt-cost", "2"]);
        assert_eq!(config.validate(), Err(ConfigError::BcryptCost(2)));

        let config = parse(&["--jwt-secret", "s", "--store-timeout-ms", "0"]);
        assert_eq!(config.validate(), Err(ConfigError::StoreTimeout));

        let config = parse(&["--jwt-secret", "s", "--store-backend", "memory"]);
        assert_eq!(config.store_backend, StoreBackend::Memory);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = parse(&["--jwt-secret", "super-secret-value"]);
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret-value"));
    }
}
