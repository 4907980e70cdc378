//! MyActivity Backend Library
//!
//! Authentication and access control for the MyActivity sales-activity API:
//! credential storage, bcrypt passwords, HS256 tokens and the role-aware
//! gate that resource routes mount.

pub mod api;
pub mod auth;
pub mod config;
pub mod middleware;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::auth::{password::PasswordHasher, user_store, AuthService, AuthState, TokenService};
use crate::config::AppConfig;

/// Wire the auth stack from a validated configuration
pub fn build_auth_state(config: &AppConfig) -> Result<AuthState> {
    config.validate()?;

    let store = user_store::connect(config.store_backend, &config.auth_db_path)?;
    let tokens = Arc::new(
        TokenService::new(&config.jwt_secret).context("Failed to initialize token service")?,
    );
    let service = AuthService::new(store, tokens, PasswordHasher::new(config.bcrypt_cost))?
        .with_store_timeout(config.store_timeout());

    Ok(Arc::new(service))
}
