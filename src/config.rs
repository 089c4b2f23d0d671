//! Application Configuration
//! Mission: Load every tunable once at startup from the environment

use crate::auth::jwt::TokenConfig;
use anyhow::{bail, Context, Result};
use chrono::Duration;
use tracing::warn;

/// Development-only signing secret, used when `JWT_SECRET` is unset.
pub const DEV_JWT_SECRET: &str = "dev-secret-change-in-production-minimum-32-characters";

/// HS256 keys shorter than this are refused.
pub const MIN_SECRET_BYTES: usize = 32;

/// Process-wide configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub bind_addr: String,
    pub token: TokenConfig,
    pub bcrypt_cost: u32,
    pub cors_allowed_origins: Vec<String>,
    pub admin_username: String,
    pub admin_password: String,
    pub seed_demo_user: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "./notes.db".to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
            token: TokenConfig {
                secret: DEV_JWT_SECRET.to_string(),
                expiration: Duration::milliseconds(86_400_000),
            },
            bcrypt_cost: bcrypt::DEFAULT_COST,
            cors_allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:8080".to_string(),
            ],
            admin_username: "admin".to_string(),
            admin_password: "admin123".to_string(),
            seed_demo_user: false,
        }
    }
}

impl Config {
    /// Load from process environment with defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("DATABASE_PATH") {
            config.database_path = v;
        }
        if let Some(v) = get("BIND_ADDR") {
            config.bind_addr = v;
        }

        match get("JWT_SECRET") {
            Some(secret) => config.token.secret = secret,
            None => warn!("⚠️  JWT_SECRET not set, using development secret"),
        }
        if config.token.secret.len() < MIN_SECRET_BYTES {
            bail!(
                "JWT_SECRET must be at least {} bytes (got {})",
                MIN_SECRET_BYTES,
                config.token.secret.len()
            );
        }

        if let Some(v) = get("JWT_EXPIRATION_MS") {
            let ms: i64 = v.parse().context("Invalid JWT_EXPIRATION_MS")?;
            if ms <= 0 {
                bail!("JWT_EXPIRATION_MS must be positive");
            }
            config.token.expiration = Duration::milliseconds(ms);
        }

        if let Some(v) = get("BCRYPT_COST") {
            let cost: u32 = v.parse().context("Invalid BCRYPT_COST")?;
            if !(4..=31).contains(&cost) {
                bail!("BCRYPT_COST must be between 4 and 31");
            }
            config.bcrypt_cost = cost;
        }

        if let Some(v) = get("CORS_ALLOWED_ORIGINS") {
            config.cors_allowed_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if config.cors_allowed_origins.iter().any(|o| o == "*") {
                bail!("CORS_ALLOWED_ORIGINS cannot contain '*' while credentials are allowed");
            }
        }

        if let Some(v) = get("ADMIN_USERNAME") {
            config.admin_username = v;
        }
        if let Some(v) = get("ADMIN_PASSWORD") {
            config.admin_password = v;
        }
        if let Some(v) = get("SEED_DEMO_USER") {
            config.seed_demo_user = parse_flag(&v);
        }

        Ok(config)
    }
}

fn parse_flag(v: &str) -> bool {
    matches!(v.trim(), "1" | "true" | "TRUE" | "on" | "ON" | "yes")
}
