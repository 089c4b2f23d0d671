//! Note Storage
//! Mission: CRUD over notes, each scoped to exactly one owning user
//!
//! Mutations take a guard closure that sees the stored note inside the same
//! transaction, so the ownership decision and the write cannot interleave
//! with another request.

use crate::auth::policy::Decision;
use crate::db::{format_timestamp, parse_timestamp, Database};
use crate::notes::models::Note;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

const NOTE_SELECT: &str = "SELECT n.id, n.title, n.content, n.created_at, n.updated_at,
        n.user_id, u.username
     FROM notes n
     JOIN users u ON u.id = n.user_id";

/// Result of a guarded mutation
#[derive(Debug, PartialEq, Eq)]
pub enum Guarded<T> {
    Done(T),
    Missing,
    Denied(Decision),
}

/// Note store over the shared database
pub struct NoteStore {
    db: Database,
}

impl NoteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a note for `owner_id`; `None` if the owner does not exist
    pub fn insert(
        &self,
        owner_id: i64,
        title: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Note>> {
        let mut conn = self.db.lock();
        let tx = conn.transaction()?;

        let owner_exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
            params![owner_id],
            |row| row.get(0),
        )?;
        if !owner_exists {
            return Ok(None);
        }

        let ts = format_timestamp(&now);
        tx.execute(
            "INSERT INTO notes (title, content, created_at, updated_at, user_id)
             VALUES (?1, ?2, ?3, ?3, ?4)",
            params![title, content, ts, owner_id],
        )
        .context("Failed to insert note")?;
        let id = tx.last_insert_rowid();

        let note = fetch(&tx, id)?.context("Inserted note vanished")?;
        tx.commit()?;

        debug!("Created note {} for user {}", id, owner_id);
        Ok(Some(note))
    }

    /// Owner's notes, most recently updated first
    pub fn list_by_owner(&self, owner_id: i64) -> Result<Vec<Note>> {
        let conn = self.db.lock();
        let sql = format!(
            "{} WHERE n.user_id = ?1 ORDER BY n.updated_at DESC, n.id DESC",
            NOTE_SELECT
        );
        let mut stmt = conn.prepare_cached(&sql)?;
        let notes = stmt
            .query_map(params![owner_id], row_to_note)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notes)
    }

    pub fn get(&self, id: i64) -> Result<Option<Note>> {
        let conn = self.db.lock();
        fetch(&conn, id)
    }

    /// Replace title and content if `guard` allows; `created_at` is never touched
    pub fn update<F>(
        &self,
        id: i64,
        title: &str,
        content: &str,
        now: DateTime<Utc>,
        guard: F,
    ) -> Result<Guarded<Note>>
    where
        F: FnOnce(&Note) -> Decision,
    {
        let mut conn = self.db.lock();
        let tx = conn.transaction()?;

        let Some(existing) = fetch(&tx, id)? else {
            return Ok(Guarded::Missing);
        };
        match guard(&existing) {
            Decision::Allow => {}
            denied => return Ok(Guarded::Denied(denied)),
        }

        tx.execute(
            "UPDATE notes SET title = ?1, content = ?2, updated_at = ?3 WHERE id = ?4",
            params![title, content, format_timestamp(&now), id],
        )
        .context("Failed to update note")?;

        let note = fetch(&tx, id)?.context("Updated note vanished")?;
        tx.commit()?;

        Ok(Guarded::Done(note))
    }

    /// Delete if `guard` allows
    pub fn delete<F>(&self, id: i64, guard: F) -> Result<Guarded<()>>
    where
        F: FnOnce(&Note) -> Decision,
    {
        let mut conn = self.db.lock();
        let tx = conn.transaction()?;

        let Some(existing) = fetch(&tx, id)? else {
            return Ok(Guarded::Missing);
        };
        match guard(&existing) {
            Decision::Allow => {}
            denied => return Ok(Guarded::Denied(denied)),
        }

        tx.execute("DELETE FROM notes WHERE id = ?1", params![id])
            .context("Failed to delete note")?;
        tx.commit()?;

        debug!("Deleted note {}", id);
        Ok(Guarded::Done(()))
    }
}

fn fetch(conn: &Connection, id: i64) -> Result<Option<Note>> {
    let sql = format!("{} WHERE n.id = ?1", NOTE_SELECT);
    let note = conn.query_row(&sql, params![id], row_to_note).optional()?;
    Ok(note)
}

fn row_to_note(row: &Row<'_>) -> rusqlite::Result<Note> {
    let created_at: String = row.get(3)?;
    let updated_at: String = row.get(4)?;
    Ok(Note {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
        owner_id: row.get(5)?,
        owner_username: row.get(6)?,
    })
}
