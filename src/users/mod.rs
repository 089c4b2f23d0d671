//! Users Module
//! Mission: Admin-facing account management over the credential store

pub mod api;
pub mod service;

pub use service::UserService;
