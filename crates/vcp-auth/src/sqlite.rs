use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};
use vcp_crypto::{hash_password, new_session_token, new_user_id, verify_password};
use vcp_types::{SessionToken, UserId};

use crate::error::{AuthError, AuthResult};
use crate::traits::CredentialStore;
use crate::types::NewUser;

/// SQL schema for the credential tables.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT UNIQUE NOT NULL,
    full_name TEXT NOT NULL,
    phone TEXT UNIQUE,
    pw_hash TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    token TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id),
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
"#;

/// SQLite-backed credential store.
///
/// One connection behind a mutex: every operation holds the lock for its
/// whole duration, so duplicate checks and inserts cannot interleave.
pub struct SqliteCredentialStore {
    conn: Mutex<Connection>,
}

impl SqliteCredentialStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> AuthResult<Self> {
        let store = Self::from_connection(Connection::open(path)?)?;
        info!(path = %path.display(), "credential database opened");
        Ok(store)
    }

    /// A private in-memory database.
    pub fn open_in_memory() -> AuthResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> AuthResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-statement leaves SQLite itself consistent.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn to_user_id(raw: String) -> AuthResult<UserId> {
    UserId::new(raw).map_err(|e| AuthError::Corrupt(e.to_string()))
}

impl CredentialStore for SqliteCredentialStore {
    fn create_user(&self, user: &NewUser) -> AuthResult<UserId> {
        user.validate()?;
        let conn = self.conn();

        let email_taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)",
            [&user.email],
            |row| row.get(0),
        )?;
        if email_taken {
            return Err(AuthError::DuplicateEmail);
        }
        if let Some(phone) = &user.phone {
            let phone_taken: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE phone = ?)",
                [phone],
                |row| row.get(0),
            )?;
            if phone_taken {
                return Err(AuthError::DuplicatePhone);
            }
        }

        let id = new_user_id();
        conn.execute(
            "INSERT INTO users (id, email, full_name, phone, pw_hash, created_at) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                id.as_str(),
                user.email,
                user.full_name,
                user.phone,
                hash_password(&user.password),
                Utc::now().timestamp()
            ],
        )?;
        debug!(user = %id, "user created");
        Ok(id)
    }

    fn authenticate(&self, email: &str, password: &str) -> AuthResult<UserId> {
        let conn = self.conn();
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT id, pw_hash FROM users WHERE email = ?",
                [email],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((id, pw_hash)) = row else {
            return Err(AuthError::InvalidCredentials);
        };
        let ok = verify_password(password, &pw_hash)
            .map_err(|e| AuthError::Corrupt(e.to_string()))?;
        if !ok {
            return Err(AuthError::InvalidCredentials);
        }
        to_user_id(id)
    }

    fn create_session(&self, user: &UserId) -> AuthResult<SessionToken> {
        let conn = self.conn();
        let token = new_session_token();
        conn.execute(
            "INSERT INTO sessions (token, user_id, created_at) VALUES (?, ?, ?)",
            params![token.as_str(), user.as_str(), Utc::now().timestamp()],
        )?;
        Ok(token)
    }

    fn resolve_session(&self, token: &str) -> AuthResult<UserId> {
        if token.is_empty() {
            return Err(AuthError::InvalidToken);
        }
        let conn = self.conn();
        let user: Option<String> = conn
            .query_row(
                "SELECT user_id FROM sessions WHERE token = ?",
                [token],
                |row| row.get(0),
            )
            .optional()?;
        user.map_or(Err(AuthError::InvalidToken), to_user_id)
    }
}

impl std::fmt::Debug for SqliteCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCredentialStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn store() -> SqliteCredentialStore {
        SqliteCredentialStore::open_in_memory().unwrap()
    }

    fn alice() -> NewUser {
        NewUser::new("a@b.com", "A", "p", "111")
    }

    #[test]
    fn signup_then_login() {
        let store = store();
        let id = store.create_user(&alice()).unwrap();
        assert_eq!(store.authenticate("a@b.com", "p").unwrap(), id);
    }

    #[test]
    fn wrong_password_and_unknown_email_look_the_same() {
        let store = store();
        store.create_user(&alice()).unwrap();
        let wrong = store.authenticate("a@b.com", "nope").unwrap_err();
        let unknown = store.authenticate("x@y.com", "p").unwrap_err();
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[test]
    fn duplicate_email_and_phone() {
        let store = store();
        store.create_user(&alice()).unwrap();
        assert!(matches!(
            store.create_user(&NewUser::new("a@b.com", "B", "q", "222")),
            Err(AuthError::DuplicateEmail)
        ));
        assert!(matches!(
            store.create_user(&NewUser::new("c@d.com", "C", "q", "111")),
            Err(AuthError::DuplicatePhone)
        ));
    }

    #[test]
    fn many_users_without_phone() {
        let store = store();
        store.create_user(&NewUser::new("a@b.com", "A", "p", "")).unwrap();
        store.create_user(&NewUser::new("c@d.com", "C", "p", "")).unwrap();
    }

    #[test]
    fn password_is_not_stored_in_clear() {
        let store = store();
        store.create_user(&NewUser::new("a@b.com", "A", "hunter2", "")).unwrap();
        let conn = store.conn();
        let stored: String = conn
            .query_row("SELECT pw_hash FROM users", [], |row| row.get(0))
            .unwrap();
        assert!(!stored.contains("hunter2"));
    }

    #[test]
    fn sessions_resolve_to_their_user() {
        let store = store();
        let id = store.create_user(&alice()).unwrap();
        let t1 = store.create_session(&id).unwrap();
        let t2 = store.create_session(&id).unwrap();
        assert_ne!(t1, t2);
        assert_eq!(store.resolve_session(t1.as_str()).unwrap(), id);
        assert_eq!(store.resolve_session(t2.as_str()).unwrap(), id);
    }

    #[test]
    fn empty_and_unknown_tokens_are_invalid() {
        let store = store();
        assert!(matches!(store.resolve_session(""), Err(AuthError::InvalidToken)));
        assert!(matches!(
            store.resolve_session("00112233445566778899aabbccddeeff"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn sessions_never_expire() {
        // Known limitation: there is no expiry or revocation path, so a token
        // issued long ago still resolves.
        let store = store();
        let id = store.create_user(&alice()).unwrap();
        let token = store.create_session(&id).unwrap();
        store
            .conn()
            .execute("UPDATE sessions SET created_at = 0", [])
            .unwrap();
        assert_eq!(store.resolve_session(token.as_str()).unwrap(), id);
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vcp_server.db");
        let token = {
            let store = SqliteCredentialStore::open(&path).unwrap();
            let id = store.create_user(&alice()).unwrap();
            store.create_session(&id).unwrap()
        };
        let store = SqliteCredentialStore::open(&path).unwrap();
        assert!(store.resolve_session(token.as_str()).is_ok());
        assert!(store.authenticate("a@b.com", "p").is_ok());
    }

    #[test]
    fn concurrent_signups_with_same_email() {
        let store = Arc::new(store());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .create_user(&NewUser::new("same@b.com", "S", "p", format!("{i}")))
                        .is_ok()
                })
            })
            .collect();
        let created = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(created, 1);
    }
}
