//! Notes Backend Library
//!
//! Exposes the service modules for the server binary and integration tests.

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod notes;
pub mod users;
pub mod validation;
