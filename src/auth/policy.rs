//! Authorization Policy
//! Mission: Decide, per operation, whether the resolved identity may proceed
//!
//! Two static tiers (`Authenticated`, `Admin`) plus an ownership check that
//! note operations run themselves once they have loaded the note.

use crate::auth::models::Identity;
use crate::error::AppError;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Permission tier required by an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Authenticated,
    Admin,
}

/// Outcome of a capability check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Unauthorized,
    Forbidden,
}

impl Decision {
    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Unauthorized => Err(AppError::Unauthorized),
            Decision::Forbidden => Err(AppError::Forbidden),
        }
    }
}

/// Role gate: no identity is `Unauthorized`, a missing role is `Forbidden`
pub fn authorize(identity: Option<&Identity>, required: Permission) -> Decision {
    match (identity, required) {
        (None, _) => Decision::Unauthorized,
        (Some(_), Permission::Authenticated) => Decision::Allow,
        (Some(id), Permission::Admin) if id.is_admin() => Decision::Allow,
        (Some(_), Permission::Admin) => Decision::Forbidden,
    }
}

/// Ownership gate for a single record
pub fn check_owner(identity: &Identity, owner_username: &str) -> Decision {
    if identity.username == owner_username {
        Decision::Allow
    } else {
        Decision::Forbidden
    }
}

/// Extractor: any verified identity
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

/// Extractor: identity carrying the admin role
#[derive(Debug, Clone)]
pub struct Admin(pub Identity);

fn gate(parts: &Parts, required: Permission) -> Result<Identity, AppError> {
    let identity = parts.extensions.get::<Identity>();
    authorize(identity, required).into_result()?;
    identity.cloned().ok_or(AppError::Unauthorized)
}

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        gate(parts, Permission::Authenticated).map(Authenticated)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Admin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        gate(parts, Permission::Admin).map(Admin)
    }
}
