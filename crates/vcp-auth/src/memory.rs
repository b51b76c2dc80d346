use std::collections::HashMap;
use std::sync::Mutex;

use vcp_crypto::{hash_password, new_session_token, new_user_id, verify_password};
use vcp_types::{SessionToken, UserId};

use crate::error::{AuthError, AuthResult};
use crate::traits::CredentialStore;
use crate::types::NewUser;

struct UserRow {
    id: UserId,
    phone: Option<String>,
    pw_hash: String,
}

#[derive(Default)]
struct State {
    users_by_email: HashMap<String, UserRow>,
    sessions: HashMap<String, UserId>,
}

/// In-memory credential store.
///
/// Intended for tests. Passwords are hashed exactly as the SQLite store
/// hashes them.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    state: Mutex<State>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered users.
    pub fn user_count(&self) -> usize {
        self.state.lock().expect("lock poisoned").users_by_email.len()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn create_user(&self, user: &NewUser) -> AuthResult<UserId> {
        user.validate()?;
        let mut state = self.state.lock().expect("lock poisoned");
        if state.users_by_email.contains_key(&user.email) {
            return Err(AuthError::DuplicateEmail);
        }
        if user.phone.is_some()
            && state
                .users_by_email
                .values()
                .any(|row| row.phone == user.phone)
        {
            return Err(AuthError::DuplicatePhone);
        }
        let id = new_user_id();
        state.users_by_email.insert(
            user.email.clone(),
            UserRow {
                id: id.clone(),
                phone: user.phone.clone(),
                pw_hash: hash_password(&user.password),
            },
        );
        Ok(id)
    }

    fn authenticate(&self, email: &str, password: &str) -> AuthResult<UserId> {
        let state = self.state.lock().expect("lock poisoned");
        let row = state
            .users_by_email
            .get(email)
            .ok_or(AuthError::InvalidCredentials)?;
        match verify_password(password, &row.pw_hash) {
            Ok(true) => Ok(row.id.clone()),
            Ok(false) => Err(AuthError::InvalidCredentials),
            Err(e) => Err(AuthError::Corrupt(e.to_string())),
        }
    }

    fn create_session(&self, user: &UserId) -> AuthResult<SessionToken> {
        let token = new_session_token();
        self.state
            .lock()
            .expect("lock poisoned")
            .sessions
            .insert(token.as_str().to_string(), user.clone());
        Ok(token)
    }

    fn resolve_session(&self, token: &str) -> AuthResult<UserId> {
        self.state
            .lock()
            .expect("lock poisoned")
            .sessions
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

impl std::fmt::Debug for InMemoryCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCredentialStore")
            .field("user_count", &self.user_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn behaves_like_the_database() {
        let store = InMemoryCredentialStore::new();
        let id = store.create_user(&NewUser::new("a@b.com", "A", "p", "111")).unwrap();
        assert!(matches!(
            store.create_user(&NewUser::new("a@b.com", "A", "p", "")),
            Err(AuthError::DuplicateEmail)
        ));
        assert!(matches!(
            store.create_user(&NewUser::new("c@d.com", "C", "p", "111")),
            Err(AuthError::DuplicatePhone)
        ));
        assert_eq!(store.authenticate("a@b.com", "p").unwrap(), id);
        assert!(matches!(
            store.authenticate("a@b.com", "q"),
            Err(AuthError::InvalidCredentials)
        ));

        let token = store.create_session(&id).unwrap();
        assert_eq!(store.resolve_session(token.as_str()).unwrap(), id);
        assert!(matches!(store.resolve_session(""), Err(AuthError::InvalidToken)));
        assert_eq!(store.user_count(), 1);
    }
}
