//! Authentication Middleware
//! Mission: Resolve a bearer token to an identity on every request
//!
//! Never rejects. A request with a missing, malformed, expired or orphaned
//! token simply carries no `Identity`; the policy extractors downstream turn
//! that into a 401.

use crate::auth::{jwt::TokenService, models::Identity, user_store::UserStore};
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, error, warn};

const BEARER_PREFIX: &str = "Bearer ";

/// Shared state for the authentication middleware
#[derive(Clone)]
pub struct Authenticator {
    tokens: Arc<TokenService>,
    users: Arc<UserStore>,
}

impl Authenticator {
    pub fn new(tokens: Arc<TokenService>, users: Arc<UserStore>) -> Self {
        Self { tokens, users }
    }

    /// Resolve request headers to a live identity, if any
    pub fn resolve(&self, headers: &HeaderMap) -> Option<Identity> {
        let token = bearer_token(headers)?;

        let username = match self.tokens.verify(token) {
            Ok(username) => username,
            Err(e) => {
                debug!("Ignoring bearer token: {}", e);
                return None;
            }
        };

        match self.users.get_user_by_username(&username) {
            Ok(Some(user)) => Some(Identity::from_user(&user)),
            Ok(None) => {
                warn!("Token subject '{}' no longer exists", username);
                None
            }
            Err(e) => {
                error!("Cannot set user authentication: {:#}", e);
                None
            }
        }
    }
}

/// Token following the literal `Bearer ` prefix of the Authorization header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix(BEARER_PREFIX))
        .filter(|t| !t.is_empty())
}

/// Auth middleware that attaches the resolved identity to the request
pub async fn authenticate(
    State(auth): State<Authenticator>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(identity) = auth.resolve(req.headers()) {
        req.extensions_mut().insert(identity);
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::TokenConfig;
    use crate::clock::{ManualClock, SystemClock};
    use crate::db::Database;
    use axum::http::HeaderValue;
    use chrono::{Duration, Utc};

    const SECRET: &str = "middleware-test-secret-0123456789abcdef";

    fn setup(clock: Arc<ManualClock>) -> (Authenticator, Arc<TokenService>, Arc<UserStore>) {
        let users = Arc::new(UserStore::new(
            Database::in_memory().unwrap(),
            4,
            Arc::new(SystemClock),
        ));
        let tokens = Arc::new(TokenService::with_clock(
            &TokenConfig {
                secret: SECRET.to_string(),
                expiration: Duration::minutes(30),
            },
            clock,
        ));
        (
            Authenticator::new(tokens.clone(), users.clone()),
            tokens,
            users,
        )
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_prefix_is_literal() {
        assert_eq!(bearer_token(&headers_with("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers_with("bearer abc.def")), None);
        assert_eq!(bearer_token(&headers_with("Basic dXNlcjpwdw==")), None);
        assert_eq!(bearer_token(&headers_with("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_valid_token_resolves_identity() {
        let (auth, tokens, users) = setup(Arc::new(ManualClock::new(Utc::now())));
        let user = users.create_user("user1", "password", &[]).unwrap();
        let issued = tokens.issue("user1").unwrap();

        let identity = auth
            .resolve(&headers_with(&format!("Bearer {}", issued.token)))
            .unwrap();
        assert_eq!(identity.id, user.id);
        assert_eq!(identity.username, "user1");
        assert_eq!(identity.roles, vec!["ROLE_USER".to_string()]);
    }

    #[test]
    fn test_expired_token_leaves_request_anonymous() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let (auth, tokens, users) = setup(clock.clone());
        users.create_user("user1", "password", &[]).unwrap();
        let issued = tokens.issue("user1").unwrap();

        clock.advance(Duration::minutes(31));
        assert!(auth
            .resolve(&headers_with(&format!("Bearer {}", issued.token)))
            .is_none());
    }

    #[test]
    fn test_deleted_user_leaves_request_anonymous() {
        let (auth, tokens, users) = setup(Arc::new(ManualClock::new(Utc::now())));
        let user = users.create_user("user1", "password", &[]).unwrap();
        let issued = tokens.issue("user1").unwrap();

        users.delete_user(user.id).unwrap();
        assert!(auth
            .resolve(&headers_with(&format!("Bearer {}", issued.token)))
            .is_none());
    }
}
