//! Authentication Models
//! Mission: Define user, role, identity and login data structures

use crate::db::ROLE_ADMIN;
use crate::error::FieldErrors;
use crate::validation::{Validate, Validator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User account
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Static role reference data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: i64,
    pub name: String,
}

/// Authenticated caller, attached to the request by the authenticator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub roles: Vec<String>,
}

impl Identity {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            roles: user.roles.clone(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }
}

/// JWT Claims payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String, // subject (username)
    pub iat: i64,    // issued at, seconds
    pub exp: i64,    // expiration, seconds
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), FieldErrors> {
        Validator::new()
            .not_blank("username", &self.username, "Username is required")
            .not_blank("password", &self.password, "Password is required")
            .finish()
    }
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: &'static str,
    pub id: i64,
    pub username: String,
    pub roles: Vec<String>,
}

/// Current identity, as seen by the server
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: i64,
    pub username: String,
    pub roles: Vec<String>,
}

impl From<&Identity> for MeResponse {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            username: identity.username.clone(),
            roles: identity.roles.clone(),
        }
    }
}

/// User response (sanitized)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            roles: user.roles.clone(),
            created_at: user.created_at,
        }
    }
}

/// Create user request (admin)
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

impl Validate for CreateUserRequest {
    fn validate(&self) -> Result<(), FieldErrors> {
        Validator::new()
            .not_blank("username", &self.username, "Username is required")
            .char_length(
                "username",
                &self.username,
                3,
                Some(50),
                "Username must be between 3 and 50 characters",
            )
            .not_blank("password", &self.password, "Password is required")
            .char_length(
                "password",
                &self.password,
                6,
                None,
                "Password must be at least 6 characters",
            )
            .finish()
    }
}
