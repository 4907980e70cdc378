//! Authentication Module
//! Mission: Secure API access with JWT tokens, bcrypt credentials and role checks

pub mod api;
pub mod errors;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod roles;
pub mod service;
pub mod user_store;

pub use api::AuthState;
pub use errors::AuthError;
pub use jwt::TokenService;
pub use middleware::{authenticate, require_auth, AuthContext, AuthGate};
pub use roles::{LeadKind, Role};
pub use service::AuthService;
pub use user_store::CredentialStore;
