//! HTTP Surface
//! Mission: Wire stores, services and middleware into one axum router

use crate::auth::{self, authenticate, AuthGate, Authenticator, TokenService, UserStore};
use crate::clock::Clock;
use crate::config::Config;
use crate::db::Database;
use crate::error::ErrorBody;
use crate::middleware::request_logging;
use crate::notes::{self, NoteService, NoteStore};
use crate::users::{self, UserService};
use anyhow::Result;
use axum::{
    extract::FromRef,
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, CorsLayer};
use tracing::warn;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub gate: AuthGate,
    pub authenticator: Authenticator,
    pub credentials: Arc<UserStore>,
    pub notes: Arc<NoteService>,
    pub users: Arc<UserService>,
}

impl AppState {
    /// Build every service over one shared database and clock
    pub fn new(db: Database, config: &Config, clock: Arc<dyn Clock>) -> Self {
        let credentials = Arc::new(UserStore::new(db.clone(), config.bcrypt_cost, clock.clone()));
        let tokens = Arc::new(TokenService::with_clock(&config.token, clock.clone()));

        Self {
            gate: AuthGate::new(credentials.clone(), tokens.clone()),
            authenticator: Authenticator::new(tokens, credentials.clone()),
            notes: Arc::new(NoteService::new(NoteStore::new(db), clock)),
            users: Arc::new(UserService::new(credentials.clone())),
            credentials,
        }
    }

    /// Startup accounts: the bootstrap admin, plus the demo user if enabled
    pub fn seed(&self, config: &Config) -> Result<()> {
        self.credentials
            .ensure_default_admin(&config.admin_username, &config.admin_password)?;
        if config.seed_demo_user {
            self.credentials.ensure_user("user1", "password")?;
        }
        Ok(())
    }
}

impl FromRef<AppState> for AuthGate {
    fn from_ref(state: &AppState) -> Self {
        state.gate.clone()
    }
}

impl FromRef<AppState> for Arc<NoteService> {
    fn from_ref(state: &AppState) -> Self {
        state.notes.clone()
    }
}

impl FromRef<AppState> for Arc<UserService> {
    fn from_ref(state: &AppState) -> Self {
        state.users.clone()
    }
}

/// Create the API router
pub fn create_router(state: AppState, allowed_origins: &[String]) -> Router {
    let api = Router::new()
        .route("/api/auth/login", post(auth::api::login))
        .route("/api/auth/me", get(auth::api::me))
        .route(
            "/api/notes",
            get(notes::api::list_notes).post(notes::api::create_note),
        )
        .route(
            "/api/notes/:id",
            get(notes::api::get_note)
                .put(notes::api::update_note)
                .delete(notes::api::delete_note),
        )
        .route(
            "/api/users",
            get(users::api::list_users).post(users::api::create_user),
        )
        .route(
            "/api/users/:id",
            get(users::api::get_user).delete(users::api::delete_user),
        )
        .route("/health", get(health_check))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.authenticator.clone(),
            authenticate,
        ))
        .with_state(state);

    api.layer(cors_layer(allowed_origins))
        .layer(middleware::from_fn(request_logging))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| {
            if origin == "*" {
                warn!("⚠️ Ignoring wildcard CORS origin, credentials are allowed");
                return None;
            }
            match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("⚠️ Ignoring invalid CORS origin: {}", origin);
                    None
                }
            }
        })
        .collect();

    // Credentials forbid wildcard headers too, so mirror whatever the browser asks for
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .expose_headers([header::AUTHORIZATION])
        .allow_credentials(true)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody::new("Not Found", "Resource not found")),
    )
}
