//! Note Models

use crate::error::FieldErrors;
use crate::validation::{Validate, Validator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored note, joined with its owner's username
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String, // HTML rich text
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner_id: i64,
    pub owner_username: String,
}

/// Create / update payload
#[derive(Debug, Clone, Deserialize)]
pub struct NoteRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl Validate for NoteRequest {
    fn validate(&self) -> Result<(), FieldErrors> {
        Validator::new()
            .not_blank("title", &self.title, "Title is required")
            .not_blank("content", &self.content, "Content is required")
            .finish()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: i64,
    pub username: String,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            title: note.title,
            content: note.content,
            created_at: note.created_at,
            updated_at: note.updated_at,
            user_id: note.owner_id,
            username: note.owner_username,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_field_names() {
        let now = Utc::now();
        let response = NoteResponse::from(Note {
            id: 1,
            title: "T".to_string(),
            content: "<p>C</p>".to_string(),
            created_at: now,
            updated_at: now,
            owner_id: 2,
            owner_username: "user1".to_string(),
        });

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["userId"], 2);
        assert_eq!(json["username"], "user1");
        assert!(json["createdAt"].is_string());
        assert!(json["updatedAt"].is_string());
    }

    #[test]
    fn test_blank_title_and_content_rejected() {
        let req: NoteRequest = serde_json::from_str(r#"{"title":"  "}"#).unwrap();
        let errors = req.validate().unwrap_err();
        assert_eq!(errors["title"], "Title is required");
        assert_eq!(errors["content"], "Content is required");
    }
}
