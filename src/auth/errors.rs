//! Auth error taxonomy and its HTTP mapping

use crate::auth::user_store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;

/// One rejected request field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    // Authentication: the caller must (re)authenticate
    #[error("authorization header is required")]
    MissingToken,
    #[error("invalid authorization header format")]
    InvalidHeader,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("identity no longer exists")]
    UnknownIdentity,
    #[error("invalid credentials")]
    InvalidCredentials,

    // Authorization
    #[error("insufficient permissions")]
    Forbidden,

    // Request problems
    #[error("invalid request")]
    Validation(Vec<FieldError>),
    #[error("username already exists")]
    UsernameTaken,

    // Server side
    #[error("credential store failure: {0}")]
    Store(#[from] StoreError),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingToken
            | AuthError::InvalidHeader
            | AuthError::InvalidToken
            | AuthError::UnknownIdentity
            | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::UsernameTaken => StatusCode::CONFLICT,
            AuthError::Store(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client
    fn public_message(&self) -> String {
        match self {
            // Same wording as a bad token: never confirm the account existed
            AuthError::UnknownIdentity => AuthError::InvalidToken.to_string(),
            AuthError::Store(_) | AuthError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.public_message();

        let body = match self {
            AuthError::Store(err) => {
                error!("Credential store error: {:#}", err);
                json!({ "error": message })
            }
            AuthError::Internal(err) => {
                error!("Internal auth error: {:#}", err);
                json!({ "error": message })
            }
            AuthError::Validation(fields) => json!({ "error": message, "fields": fields }),
            _ => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}
