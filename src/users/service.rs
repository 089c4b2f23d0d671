//! User Administration
//! Mission: Create, list, inspect and remove accounts on behalf of an admin

use crate::auth::models::{CreateUserRequest, User};
use crate::auth::user_store::UserStore;
use crate::error::{AppError, Resource};
use std::sync::Arc;
use tracing::info;

pub struct UserService {
    store: Arc<UserStore>,
}

impl UserService {
    pub fn new(store: Arc<UserStore>) -> Self {
        Self { store }
    }

    /// Absent or empty `roles` means the base role only
    pub fn create(&self, req: &CreateUserRequest) -> Result<User, AppError> {
        let roles = req.roles.as_deref().unwrap_or_default();
        Ok(self.store.create_user(&req.username, &req.password, roles)?)
    }

    pub fn list(&self) -> Result<Vec<User>, AppError> {
        Ok(self.store.list_users()?)
    }

    pub fn get(&self, id: i64) -> Result<User, AppError> {
        self.store
            .get_user(id)?
            .ok_or(AppError::NotFound(Resource::User))
    }

    /// Removes the account together with its notes and role links
    pub fn delete(&self, id: i64) -> Result<(), AppError> {
        let notes_removed = self
            .store
            .delete_user(id)?
            .ok_or(AppError::NotFound(Resource::User))?;

        info!("👤 User {} removed ({} note(s) cascaded)", id, notes_removed);
        Ok(())
    }
}
