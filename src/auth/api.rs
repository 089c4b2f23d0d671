//! Authentication API Endpoints
//! Mission: Provide login and current-identity endpoints

use crate::auth::{
    gate::AuthGate,
    models::{LoginRequest, LoginResponse, MeResponse},
    policy::Authenticated,
};
use crate::error::AppError;
use crate::validation::ValidatedJson;
use axum::{extract::State, Json};

/// Login endpoint - POST /api/auth/login
pub async fn login(
    State(gate): State<AuthGate>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let response = gate.login(&payload.username, &payload.password)?;
    Ok(Json(response))
}

/// Get current user - GET /api/auth/me
pub async fn me(Authenticated(identity): Authenticated) -> Json<MeResponse> {
    Json(MeResponse::from(&identity))
}
