//! Authentication Models
//! Mission: Define secure user and authentication data structures

use crate::auth::roles::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User account
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub image: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Mutable profile fields. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub image: Option<String>,
}

/// JWT Claims payload
///
/// Every field except the contact fields is mandatory; a token missing any
/// of them fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // subject (user_id)
    pub username: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub iat: i64, // issued at, unix seconds
    pub exp: i64, // expiration timestamp, unix seconds
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Registration request body
///
/// Fields default when absent so validation can report each one.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "phone_num")]
    pub phone: String,
    #[serde(default)]
    pub role: Option<i64>,
}

/// Profile update body
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    #[serde(alias = "phone_num")]
    pub phone: Option<String>,
    pub image: Option<String>,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64, // seconds until expiration
    #[serde(flatten)]
    pub user: UserResponse,
}

/// User response (sanitized)
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl UserResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            image: user.image.clone(),
            role: user.role,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

/// What the token alone says about the caller
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub expires_at: i64,
}

impl SessionResponse {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username.clone(),
            role: claims.role,
            expires_at: claims.exp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            phone: "555".to_string(),
            image: None,
            password_hash: "$2b$04$secret".to_string(),
            role: Role::Bfa,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], 1);

        let json = serde_json::to_value(UserResponse::from_user(&sample_user())).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("image").is_none());
    }

    #[test]
    fn test_register_request_accepts_phone_num_alias() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"username":"alice","password":"secret1","email":"a@x.com","phone_num":"555","role":1}"#,
        )
        .unwrap();
        assert_eq!(req.phone, "555");
        assert_eq!(req.role, Some(1));
    }

    #[test]
    fn test_claims_require_mandatory_fields() {
        let missing_role = format!(
            r#"{{"sub":"{}","username":"alice","iat":1,"exp":2}}"#,
            Uuid::new_v4()
        );
        assert!(serde_json::from_str::<Claims>(&missing_role).is_err());

        let bad_sub = r#"{"sub":"not-a-uuid","username":"alice","role":1,"iat":1,"exp":2}"#;
        assert!(serde_json::from_str::<Claims>(bad_sub).is_err());
    }

    #[test]
    fn test_login_response_flattens_user() {
        let response = LoginResponse {
            access_token: "tok".to_string(),
            token_type: "Bearer",
            expires_in: 86400,
            user: UserResponse::from_user(&sample_user()),
        };
        let json = serde_json::to_value(response).unwrap();
        assert_eq!(json["token_type"], "Bearer");
        assert_eq!(json["expires_in"], 86400);
        assert_eq!(json["username"], "alice");
        assert_eq!(json["phone"], "555");
    }
}
