//! User Storage
//! Mission: Securely store and manage user accounts and their roles with SQLite

use crate::auth::models::{Role, User};
use crate::clock::Clock;
use crate::db::{format_timestamp, parse_timestamp, Database, ROLE_ADMIN, ROLE_USER};
use crate::error::AppError;
use anyhow::{Context, Result};
use bcrypt::{hash, verify};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

const USER_COLUMNS: &str = "id, username, password_hash, created_at";

/// Checked against on unknown usernames so both login failures cost one bcrypt verify
const DECOY_PASSWORD: &str = "decoy-password-for-unknown-users";

/// Why a user could not be created
#[derive(Debug)]
pub enum CreateUserError {
    UsernameTaken,
    UnknownRole(String),
    Storage(anyhow::Error),
}

impl fmt::Display for CreateUserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreateUserError::UsernameTaken => write!(f, "Username already exists"),
            CreateUserError::UnknownRole(name) => write!(f, "Role not found: {}", name),
            CreateUserError::Storage(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl std::error::Error for CreateUserError {}

impl From<rusqlite::Error> for CreateUserError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => CreateUserError::UsernameTaken,
            _ => CreateUserError::Storage(err.into()),
        }
    }
}

impl From<CreateUserError> for AppError {
    fn from(err: CreateUserError) -> Self {
        match err {
            CreateUserError::UsernameTaken => AppError::DuplicateUsername,
            CreateUserError::UnknownRole(name) => AppError::UnknownRole(name),
            CreateUserError::Storage(e) => AppError::Internal(e),
        }
    }
}

/// Credential store: users, password hashes and role links
pub struct UserStore {
    db: Database,
    bcrypt_cost: u32,
    decoy_hash: Option<String>,
    clock: Arc<dyn Clock>,
}

impl UserStore {
    pub fn new(db: Database, bcrypt_cost: u32, clock: Arc<dyn Clock>) -> Self {
        let decoy_hash = match hash(DECOY_PASSWORD, bcrypt_cost) {
            Ok(h) => Some(h),
            Err(e) => {
                warn!("⚠️  Failed to prepare decoy hash: {}", e);
                None
            }
        };

        Self {
            db,
            bcrypt_cost,
            decoy_hash,
            clock,
        }
    }

    /// Create the bootstrap admin account if no user holds the admin role
    pub fn ensure_default_admin(&self, username: &str, password: &str) -> Result<()> {
        let admins: i64 = {
            let conn = self.db.lock();
            conn.query_row(
                "SELECT COUNT(*) FROM user_roles ur
                 JOIN roles r ON r.id = ur.role_id
                 WHERE r.name = ?1",
                params![ROLE_ADMIN],
                |row| row.get(0),
            )
            .context("Failed to check for admin users")?
        };

        if admins > 0 {
            return Ok(());
        }

        let roles = [ROLE_ADMIN.to_string(), ROLE_USER.to_string()];
        match self.create_user(username, password, &roles) {
            Ok(_) => {
                info!("🔐 Default admin user created (username: {})", username);
                warn!("⚠️  CHANGE DEFAULT PASSWORD IN PRODUCTION!");
                Ok(())
            }
            Err(CreateUserError::UsernameTaken) => {
                warn!(
                    "⚠️  No admin account exists and username '{}' is taken by a non-admin",
                    username
                );
                Ok(())
            }
            Err(e) => Err(anyhow::anyhow!("Failed to create default admin: {}", e)),
        }
    }

    /// Create a base-role account unless the username already exists
    pub fn ensure_user(&self, username: &str, password: &str) -> Result<()> {
        if self.exists_by_username(username)? {
            return Ok(());
        }
        match self.create_user(username, password, &[]) {
            Ok(_) | Err(CreateUserError::UsernameTaken) => Ok(()),
            Err(e) => Err(anyhow::anyhow!("Failed to seed user {}: {}", username, e)),
        }
    }

    /// Get user by username
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.db.lock();
        let sql = format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS);
        let user = conn
            .query_row(&sql, params![username], row_to_user)
            .optional()?;

        match user {
            Some(user) => Ok(Some(with_roles(&conn, user)?)),
            None => Ok(None),
        }
    }

    /// Get user by id
    pub fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let conn = self.db.lock();
        let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
        let user = conn.query_row(&sql, params![user_id], row_to_user).optional()?;

        match user {
            Some(user) => Ok(Some(with_roles(&conn, user)?)),
            None => Ok(None),
        }
    }

    pub fn exists_by_username(&self, username: &str) -> Result<bool> {
        let conn = self.db.lock();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
            params![username],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Verify username and password, returning the user on a match
    pub fn verify_password(&self, username: &str, password: &str) -> Result<Option<User>> {
        match self.get_user_by_username(username)? {
            Some(user) => {
                let valid =
                    verify(password, &user.password_hash).context("Failed to verify password")?;
                Ok(valid.then_some(user))
            }
            None => {
                if let Some(decoy) = &self.decoy_hash {
                    let _ = verify(password, decoy);
                }
                Ok(None)
            }
        }
    }

    /// Create a new user; an empty role list means the base role
    pub fn create_user(
        &self,
        username: &str,
        password: &str,
        roles: &[String],
    ) -> Result<User, CreateUserError> {
        // Hash outside the lock, bcrypt is deliberately slow
        let password_hash = hash(password, self.bcrypt_cost)
            .context("Failed to hash password")
            .map_err(CreateUserError::Storage)?;
        let created_at = self.clock.now();

        let requested: Vec<String> = if roles.is_empty() {
            vec![ROLE_USER.to_string()]
        } else {
            roles.to_vec()
        };

        let mut conn = self.db.lock();
        let tx = conn.transaction()?;

        let taken: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
            params![username],
            |row| row.get(0),
        )?;
        if taken {
            return Err(CreateUserError::UsernameTaken);
        }

        let mut resolved = Vec::with_capacity(requested.len());
        for name in &requested {
            let role = find_role(&tx, name)
                .map_err(CreateUserError::Storage)?
                .ok_or_else(|| CreateUserError::UnknownRole(name.clone()))?;
            if !resolved.iter().any(|r: &Role| r.id == role.id) {
                resolved.push(role);
            }
        }

        tx.execute(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
            params![username, password_hash, format_timestamp(&created_at)],
        )?;
        let user_id = tx.last_insert_rowid();

        for role in &resolved {
            tx.execute(
                "INSERT INTO user_roles (user_id, role_id) VALUES (?1, ?2)",
                params![user_id, role.id],
            )?;
        }

        tx.commit()?;

        let mut role_names: Vec<String> = resolved.into_iter().map(|r| r.name).collect();
        role_names.sort();

        info!("✅ Created user: {} ({})", username, role_names.join(", "));

        Ok(User {
            id: user_id,
            username: username.to_string(),
            password_hash,
            roles: role_names,
            created_at,
        })
    }

    /// List all users (admin only)
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.db.lock();
        let sql = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        let users = stmt
            .query_map([], row_to_user)?
            .collect::<Result<Vec<_>, _>>()?;

        users
            .into_iter()
            .map(|user| with_roles(&conn, user))
            .collect()
    }

    /// Delete a user, its role links and every note it owns in one transaction.
    /// Returns the number of notes removed, or `None` if the user did not exist.
    pub fn delete_user(&self, user_id: i64) -> Result<Option<usize>> {
        let mut conn = self.db.lock();
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
            params![user_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Ok(None);
        }

        let notes_removed = tx.execute("DELETE FROM notes WHERE user_id = ?1", params![user_id])?;
        tx.execute("DELETE FROM user_roles WHERE user_id = ?1", params![user_id])?;
        tx.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
        tx.commit().context("Failed to commit user deletion")?;

        info!("🗑️  Deleted user {} and {} note(s)", user_id, notes_removed);
        Ok(Some(notes_removed))
    }
}

fn find_role(conn: &Connection, name: &str) -> Result<Option<Role>> {
    let role = conn
        .query_row(
            "SELECT id, name FROM roles WHERE name = ?1",
            params![name],
            |row| {
                Ok(Role {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(role)
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let created_at: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        roles: Vec::new(),
        created_at: parse_timestamp(&created_at)?,
    })
}

fn with_roles(conn: &Connection, mut user: User) -> Result<User> {
    let mut stmt = conn.prepare_cached(
        "SELECT r.name FROM roles r
         JOIN user_roles ur ON ur.role_id = r.id
         WHERE ur.user_id = ?1
         ORDER BY r.name",
    )?;
    user.roles = stmt
        .query_map(params![user.id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use std::time::Instant;
    use tempfile::NamedTempFile;

    fn create_test_store() -> UserStore {
        let db = Database::in_memory().unwrap();
        UserStore::new(db, 4, Arc::new(SystemClock))
    }

    #[test]
    fn test_default_admin_created() {
        let store = create_test_store();
        store.ensure_default_admin("admin", "admin123").unwrap();

        let admin = store.get_user_by_username("admin").unwrap().unwrap();
        assert_eq!(admin.roles, vec![ROLE_ADMIN.to_string(), ROLE_USER.to_string()]);

        // Second call is a no-op
        store.ensure_default_admin("admin", "other").unwrap();
        assert_eq!(store.list_users().unwrap().len(), 1);
        assert!(store.verify_password("admin", "admin123").unwrap().is_some());
    }

    #[test]
    fn test_password_verification() {
        let store = create_test_store();
        store.create_user("user1", "password", &[]).unwrap();

        // Correct password
        let user = store.verify_password("user1", "password").unwrap();
        assert_eq!(user.unwrap().username, "user1");

        // Incorrect password
        assert!(store.verify_password("user1", "wrongpassword").unwrap().is_none());

        // Non-existent user
        assert!(store.verify_password("nobody", "password").unwrap().is_none());
    }

    #[test]
    fn test_decoy_hash_uses_configured_cost() {
        let store = create_test_store();
        let decoy = store.decoy_hash.as_deref().unwrap();
        assert!(decoy.starts_with("$2b$04$"));
        assert!(verify(DECOY_PASSWORD, decoy).unwrap());
    }

    #[test]
    fn test_unknown_user_costs_a_bcrypt_verify() {
        let store = UserStore::new(Database::in_memory().unwrap(), 8, Arc::new(SystemClock));
        store.create_user("user1", "password", &[]).unwrap();

        let time = |username: &str| {
            let start = Instant::now();
            for _ in 0..3 {
                assert!(store.verify_password(username, "wrong").unwrap().is_none());
            }
            start.elapsed()
        };

        let wrong_password = time("user1");
        let unknown_user = time("nobody");

        // Without the decoy verify the unknown path is orders of magnitude faster
        assert!(
            unknown_user * 4 >= wrong_password,
            "unknown user {:?} vs wrong password {:?}",
            unknown_user,
            wrong_password
        );
    }

    #[test]
    fn test_password_stored_hashed() {
        let store = create_test_store();
        let user = store.create_user("user1", "password", &[]).unwrap();
        assert_ne!(user.password_hash, "password");
        assert!(user.password_hash.starts_with("$2"));
    }

    #[test]
    fn test_create_defaults_to_base_role() {
        let store = create_test_store();
        let user = store.create_user("user1", "password", &[]).unwrap();
        assert_eq!(user.roles, vec![ROLE_USER.to_string()]);

        let retrieved = store.get_user(user.id).unwrap().unwrap();
        assert_eq!(retrieved.roles, vec![ROLE_USER.to_string()]);
        assert_eq!(retrieved.created_at, user.created_at);
    }

    #[test]
    fn test_create_with_explicit_roles() {
        let store = create_test_store();
        let roles = vec![ROLE_ADMIN.to_string(), ROLE_ADMIN.to_string()];
        let user = store.create_user("boss", "password", &roles).unwrap();
        assert_eq!(user.roles, vec![ROLE_ADMIN.to_string()]);
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let store = create_test_store();
        store.create_user("user1", "password", &[]).unwrap();

        for roles in [vec![], vec![ROLE_ADMIN.to_string()], vec!["ROLE_GHOST".to_string()]] {
            let err = store.create_user("user1", "another", &roles).unwrap_err();
            assert!(matches!(err, CreateUserError::UsernameTaken));
        }
    }

    #[test]
    fn test_unknown_role_rejected_without_side_effects() {
        let store = create_test_store();
        let roles = vec![ROLE_USER.to_string(), "ROLE_GHOST".to_string()];
        let err = store.create_user("user1", "password", &roles).unwrap_err();

        match err {
            CreateUserError::UnknownRole(name) => assert_eq!(name, "ROLE_GHOST"),
            other => panic!("unexpected error: {}", other),
        }
        assert!(!store.exists_by_username("user1").unwrap());
    }

    #[test]
    fn test_find_role() {
        let store = create_test_store();
        let conn = store.db.lock();
        assert_eq!(find_role(&conn, ROLE_ADMIN).unwrap().unwrap().name, ROLE_ADMIN);
        assert!(find_role(&conn, "ADMIN").unwrap().is_none());
    }

    #[test]
    fn test_list_users() {
        let store = create_test_store();
        store.ensure_default_admin("admin", "admin123").unwrap();
        store.create_user("user1", "pass", &[]).unwrap();
        store.create_user("user2", "pass", &[]).unwrap();

        let users = store.list_users().unwrap();
        let names: Vec<&str> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["admin", "user1", "user2"]);
    }

    #[test]
    fn test_delete_user() {
        let store = create_test_store();
        let user = store.create_user("tempuser", "pass", &[]).unwrap();

        assert_eq!(store.delete_user(user.id).unwrap(), Some(0));
        assert!(store.get_user_by_username("tempuser").unwrap().is_none());

        // Deleting again reports absence
        assert_eq!(store.delete_user(user.id).unwrap(), None);
    }

    #[test]
    fn test_survives_reopen_on_disk() {
        let temp = NamedTempFile::new().unwrap();
        let path = temp.path().to_str().unwrap();

        {
            let store = UserStore::new(Database::open(path).unwrap(), 4, Arc::new(SystemClock));
            store.create_user("user1", "password", &[]).unwrap();
        }

        let store = UserStore::new(Database::open(path).unwrap(), 4, Arc::new(SystemClock));
        assert!(store.verify_password("user1", "password").unwrap().is_some());
    }

    #[test]
    fn test_ensure_user_is_idempotent() {
        let store = create_test_store();
        store.ensure_user("user1", "password").unwrap();
        store.ensure_user("user1", "changed").unwrap();

        assert_eq!(store.list_users().unwrap().len(), 1);
        assert!(store.verify_password("user1", "password").unwrap().is_some());
    }
}
