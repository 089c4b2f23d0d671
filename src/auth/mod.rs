//! Authentication Module
//! Mission: Secure API access with JWT bearer tokens, roles and ownership checks

pub mod api;
pub mod gate;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod user_store;

pub use gate::AuthGate;
pub use jwt::{TokenConfig, TokenService};
pub use middleware::{authenticate, Authenticator};
pub use models::Identity;
pub use policy::{Admin, Authenticated};
pub use user_store::UserStore;
