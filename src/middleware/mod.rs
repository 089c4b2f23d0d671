//! HTTP middleware shared by every route.
//!
//! Authentication lives in `auth::middleware`.

pub mod logging;

pub use logging::request_logging;
