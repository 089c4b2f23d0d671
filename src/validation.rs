//! Request Validation
//! Mission: Reject malformed payloads before they reach a service
//!
//! Handlers take `ValidatedJson<T>` instead of `Json<T>`: the body is parsed,
//! then `T::validate` runs, and both kinds of failure come back as `AppError`
//! so the caller always sees the JSON error shapes.

use crate::error::{AppError, FieldErrors};
use async_trait::async_trait;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Path, Request,
    },
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Payload-level validation rules
pub trait Validate {
    fn validate(&self) -> Result<(), FieldErrors>;
}

/// Collects per-field failures, first failure per field wins
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn not_blank(&mut self, field: &str, value: &str, message: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.fail(field, message);
        }
        self
    }

    pub fn char_length(
        &mut self,
        field: &str,
        value: &str,
        min: usize,
        max: Option<usize>,
        message: &str,
    ) -> &mut Self {
        let len = value.chars().count();
        if len < min || max.is_some_and(|max| len > max) {
            self.fail(field, message);
        }
        self
    }

    fn fail(&mut self, field: &str, message: &str) {
        self.errors
            .entry(field.to_string())
            .or_insert_with(|| message.to_string());
    }

    pub fn finish(&mut self) -> Result<(), FieldErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }
}

/// JSON body extractor that also runs `Validate`
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| {
                debug!("Rejected request body: {}", rejection.body_text());
                AppError::BadRequest(rejection.body_text())
            })?;

        value.validate().map_err(AppError::Validation)?;

        Ok(ValidatedJson(value))
    }
}

/// Numeric `:id` path segment; anything else is a JSON 400
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdPath(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: PathRejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(IdPath(id))
    }
}
