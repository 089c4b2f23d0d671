//! User Management API Endpoints
//! Mission: Admin-only account management

use crate::auth::models::{CreateUserRequest, UserResponse};
use crate::auth::policy::Admin;
use crate::error::AppError;
use crate::users::service::UserService;
use crate::validation::{IdPath, ValidatedJson};
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::info;

/// List all users - GET /api/users (Admin only)
pub async fn list_users(
    State(users): State<Arc<UserService>>,
    Admin(_admin): Admin,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let response = users.list()?.iter().map(UserResponse::from_user).collect();
    Ok(Json(response))
}

/// Get user - GET /api/users/:id (Admin only)
pub async fn get_user(
    State(users): State<Arc<UserService>>,
    Admin(_admin): Admin,
    IdPath(id): IdPath,
) -> Result<Json<UserResponse>, AppError> {
    let user = users.get(id)?;
    Ok(Json(UserResponse::from_user(&user)))
}

/// Create user - POST /api/users (Admin only)
pub async fn create_user(
    State(users): State<Arc<UserService>>,
    Admin(admin): Admin,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = users.create(&payload)?;
    info!("✅ User {} created by admin {}", user.username, admin.username);
    Ok((StatusCode::CREATED, Json(UserResponse::from_user(&user))))
}

/// Delete user - DELETE /api/users/:id (Admin only)
pub async fn delete_user(
    State(users): State<Arc<UserService>>,
    Admin(_admin): Admin,
    IdPath(id): IdPath,
) -> Result<StatusCode, AppError> {
    users.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}
