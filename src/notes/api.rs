//! Notes API Endpoints
//! Mission: CRUD over the caller's own notes

use crate::auth::policy::Authenticated;
use crate::error::AppError;
use crate::notes::models::{NoteRequest, NoteResponse};
use crate::notes::service::NoteService;
use crate::validation::{IdPath, ValidatedJson};
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

/// List own notes - GET /api/notes
pub async fn list_notes(
    State(notes): State<Arc<NoteService>>,
    Authenticated(identity): Authenticated,
) -> Result<Json<Vec<NoteResponse>>, AppError> {
    let response = notes
        .list(&identity)?
        .into_iter()
        .map(NoteResponse::from)
        .collect();
    Ok(Json(response))
}

/// Get note - GET /api/notes/:id
pub async fn get_note(
    State(notes): State<Arc<NoteService>>,
    Authenticated(identity): Authenticated,
    IdPath(id): IdPath,
) -> Result<Json<NoteResponse>, AppError> {
    Ok(Json(notes.get(&identity, id)?.into()))
}

/// Create note - POST /api/notes
pub async fn create_note(
    State(notes): State<Arc<NoteService>>,
    Authenticated(identity): Authenticated,
    ValidatedJson(payload): ValidatedJson<NoteRequest>,
) -> Result<(StatusCode, Json<NoteResponse>), AppError> {
    let note = notes.create(&identity, &payload)?;
    Ok((StatusCode::CREATED, Json(note.into())))
}

/// Update note - PUT /api/notes/:id
pub async fn update_note(
    State(notes): State<Arc<NoteService>>,
    Authenticated(identity): Authenticated,
    IdPath(id): IdPath,
    ValidatedJson(payload): ValidatedJson<NoteRequest>,
) -> Result<Json<NoteResponse>, AppError> {
    Ok(Json(notes.update(&identity, id, &payload)?.into()))
}

/// Delete note - DELETE /api/notes/:id
pub async fn delete_note(
    State(notes): State<Arc<NoteService>>,
    Authenticated(identity): Authenticated,
    IdPath(id): IdPath,
) -> Result<StatusCode, AppError> {
    notes.delete(&identity, id)?;
    Ok(StatusCode::NO_CONTENT)
}
