//! JWT Token Service
//! Mission: Issue and verify signed, time-limited bearer tokens

use crate::auth::models::Claims;
use crate::clock::{Clock, SystemClock};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Signing secret and token lifetime, fixed for the life of the process
#[derive(Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub expiration: Duration,
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Why a presented token was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    InvalidSignature,
    Expired,
    Malformed,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::InvalidSignature => write!(f, "Invalid token signature"),
            TokenError::Expired => write!(f, "Token expired"),
            TokenError::Malformed => write!(f, "Malformed token"),
        }
    }
}

impl std::error::Error for TokenError {}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Token issuance and verification
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiration: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(config: &TokenConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &TokenConfig, clock: Arc<dyn Clock>) -> Self {
        // Expiry is judged against our clock below, not the library's
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            expiration: config.expiration,
            clock,
        }
    }

    /// Sign a token for `subject`, valid for the configured duration
    pub fn issue(&self, subject: &str) -> Result<IssuedToken> {
        // `iat`/`exp` are whole seconds; keep the reported instants identical
        let issued_at = self.clock.now().trunc_subsecs(0);
        let expires_at = issued_at
            .checked_add_signed(self.expiration)
            .context("Invalid timestamp")?;

        let claims = Claims {
            sub: subject.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("Failed to generate JWT")?;

        debug!("Issued JWT for {} (expires {})", subject, expires_at);

        Ok(IssuedToken {
            token,
            issued_at,
            expires_at,
        })
    }

    /// Check signature and expiry, returning the embedded subject
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        let decoded = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            },
        )?;

        let claims = decoded.claims;
        if self.clock.now().timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims.sub)
    }
}
