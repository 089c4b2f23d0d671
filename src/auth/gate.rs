//! Authentication Gate
//! Mission: Trade a username/password pair for a bearer token

use crate::auth::{jwt::TokenService, models::LoginResponse, user_store::UserStore};
use crate::error::AppError;
use std::sync::Arc;
use tracing::{info, warn};

/// Credential check + token minting
#[derive(Clone)]
pub struct AuthGate {
    users: Arc<UserStore>,
    tokens: Arc<TokenService>,
}

impl AuthGate {
    pub fn new(users: Arc<UserStore>, tokens: Arc<TokenService>) -> Self {
        Self { users, tokens }
    }

    /// Verify credentials and issue a token for the user
    pub fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AppError> {
        info!("🔐 Login attempt: {}", username);

        let user = match self.users.verify_password(username, password)? {
            Some(user) => user,
            None => {
                warn!("❌ Failed login attempt: {}", username);
                return Err(AppError::InvalidCredentials);
            }
        };

        let issued = self.tokens.issue(&user.username)?;

        info!(
            "✅ Login successful: {} ({})",
            user.username,
            user.roles.join(", ")
        );

        Ok(LoginResponse {
            token: issued.token,
            token_type: "Bearer",
            id: user.id,
            username: user.username,
            roles: user.roles,
        })
    }
}
