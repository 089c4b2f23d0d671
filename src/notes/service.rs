//! Note Operations
//! Mission: Every note operation scoped to the identity performing it

use crate::auth::models::Identity;
use crate::auth::policy::check_owner;
use crate::clock::Clock;
use crate::error::{AppError, Resource};
use crate::notes::models::{Note, NoteRequest};
use crate::notes::store::{Guarded, NoteStore};
use std::sync::Arc;
use tracing::{info, warn};

pub struct NoteService {
    store: NoteStore,
    clock: Arc<dyn Clock>,
}

impl NoteService {
    pub fn new(store: NoteStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn create(&self, identity: &Identity, req: &NoteRequest) -> Result<Note, AppError> {
        let note = self
            .store
            .insert(identity.id, &req.title, &req.content, self.clock.now())?
            .ok_or(AppError::NotFound(Resource::User))?;

        info!("📝 Note {} created by {}", note.id, identity.username);
        Ok(note)
    }

    pub fn list(&self, identity: &Identity) -> Result<Vec<Note>, AppError> {
        Ok(self.store.list_by_owner(identity.id)?)
    }

    pub fn get(&self, identity: &Identity, id: i64) -> Result<Note, AppError> {
        let note = self
            .store
            .get(id)?
            .ok_or(AppError::NotFound(Resource::Note))?;

        check_owner(identity, &note.owner_username)
            .into_result()
            .inspect_err(|_| deny_log(identity, "read", id))?;
        Ok(note)
    }

    /// Ownership is re-checked inside the write transaction
    pub fn update(
        &self,
        identity: &Identity,
        id: i64,
        req: &NoteRequest,
    ) -> Result<Note, AppError> {
        let outcome = self.store.update(
            id,
            &req.title,
            &req.content,
            self.clock.now(),
            |note| check_owner(identity, &note.owner_username),
        )?;

        match outcome {
            Guarded::Done(note) => Ok(note),
            Guarded::Missing => Err(AppError::NotFound(Resource::Note)),
            Guarded::Denied(decision) => {
                deny_log(identity, "update", id);
                Err(decision.into_result().err().unwrap_or(AppError::Forbidden))
            }
        }
    }

    pub fn delete(&self, identity: &Identity, id: i64) -> Result<(), AppError> {
        let outcome = self
            .store
            .delete(id, |note| check_owner(identity, &note.owner_username))?;

        match outcome {
            Guarded::Done(()) => {
                info!("🗑️  Note {} deleted by {}", id, identity.username);
                Ok(())
            }
            Guarded::Missing => Err(AppError::NotFound(Resource::Note)),
            Guarded::Denied(decision) => {
                deny_log(identity, "delete", id);
                Err(decision.into_result().err().unwrap_or(AppError::Forbidden))
            }
        }
    }
}

fn deny_log(identity: &Identity, action: &str, note_id: i64) {
    warn!(
        "🚫 {} attempted to {} note {} owned by someone else",
        identity.username, action, note_id
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::user_store::UserStore;
    use crate::clock::ManualClock;
    use crate::db::Database;
    use chrono::{Duration, SubsecRound, Utc};

    struct Fixture {
        service: NoteService,
        users: UserStore,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let db = Database::in_memory().unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now().trunc_subsecs(6)));
        Fixture {
            service: NoteService::new(NoteStore::new(db.clone()), clock.clone()),
            users: UserStore::new(db, 4, clock.clone()),
            clock,
        }
    }

    fn identity_for(users: &UserStore, username: &str) -> Identity {
        let user = users.create_user(username, "password", &[]).unwrap();
        Identity::from_user(&user)
    }

    fn request(title: &str, content: &str) -> NoteRequest {
        NoteRequest {
            title: title.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_create_assigns_owner() {
        let f = fixture();
        let user1 = identity_for(&f.users, "user1");

        let note = f.service.create(&user1, &request("T", "C")).unwrap();
        assert_eq!(note.owner_username, "user1");
        assert_eq!(note.owner_id, user1.id);
        assert_eq!(note.created_at, f.clock.now());
        assert_eq!(note.updated_at, note.created_at);
    }

    #[test]
    fn test_create_for_deleted_identity() {
        let f = fixture();
        let user1 = identity_for(&f.users, "user1");
        f.users.delete_user(user1.id).unwrap();

        let err = f.service.create(&user1, &request("T", "C")).unwrap_err();
        assert!(matches!(err, AppError::NotFound(Resource::User)));
    }

    #[test]
    fn test_list_only_own_notes() {
        let f = fixture();
        let user1 = identity_for(&f.users, "user1");
        let user2 = identity_for(&f.users, "user2");

        f.service.create(&user1, &request("mine", "x")).unwrap();
        f.service.create(&user2, &request("theirs", "x")).unwrap();

        let notes = f.service.list(&user1).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "mine");
    }

    #[test]
    fn test_non_owner_is_forbidden_everywhere() {
        let f = fixture();
        let user1 = identity_for(&f.users, "user1");
        let user2 = identity_for(&f.users, "user2");
        let note = f.service.create(&user1, &request("T", "C")).unwrap();

        assert!(matches!(
            f.service.get(&user2, note.id),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            f.service.update(&user2, note.id, &request("x", "y")),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            f.service.delete(&user2, note.id),
            Err(AppError::Forbidden)
        ));

        // Untouched
        let stored = f.service.get(&user1, note.id).unwrap();
        assert_eq!(stored, note);
    }

    #[test]
    fn test_admin_has_no_note_override() {
        let f = fixture();
        let user1 = identity_for(&f.users, "user1");
        let admin = Identity::from_user(
            &f.users
                .create_user("root", "password", &["ROLE_ADMIN".to_string()])
                .unwrap(),
        );
        let note = f.service.create(&user1, &request("T", "C")).unwrap();

        assert!(matches!(
            f.service.get(&admin, note.id),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn test_missing_note_is_not_found() {
        let f = fixture();
        let user1 = identity_for(&f.users, "user1");

        assert!(matches!(
            f.service.get(&user1, 404),
            Err(AppError::NotFound(Resource::Note))
        ));
        assert!(matches!(
            f.service.update(&user1, 404, &request("x", "y")),
            Err(AppError::NotFound(Resource::Note))
        ));
        assert!(matches!(
            f.service.delete(&user1, 404),
            Err(AppError::NotFound(Resource::Note))
        ));
    }

    #[test]
    fn test_update_refreshes_updated_at_only() {
        let f = fixture();
        let user1 = identity_for(&f.users, "user1");
        let note = f.service.create(&user1, &request("T", "C")).unwrap();

        f.clock.advance(Duration::minutes(10));
        let updated = f
            .service
            .update(&user1, note.id, &request("T2", "<b>C2</b>"))
            .unwrap();

        assert_eq!(updated.created_at, note.created_at);
        assert_eq!(updated.updated_at, f.clock.now());
        assert!(updated.updated_at > note.updated_at);
        assert_eq!(updated.content, "<b>C2</b>");
    }

    #[test]
    fn test_owner_delete() {
        let f = fixture();
        let user1 = identity_for(&f.users, "user1");
        let note = f.service.create(&user1, &request("T", "C")).unwrap();

        f.service.delete(&user1, note.id).unwrap();
        assert!(matches!(
            f.service.get(&user1, note.id),
            Err(AppError::NotFound(Resource::Note))
        ));
    }
}
