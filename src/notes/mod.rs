//! Notes Module
//! Mission: User-scoped rich-text notes with ownership enforcement

pub mod api;
pub mod models;
pub mod service;
pub mod store;

pub use models::{Note, NoteRequest, NoteResponse};
pub use service::NoteService;
pub use store::NoteStore;
