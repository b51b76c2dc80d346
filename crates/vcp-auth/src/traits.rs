use vcp_types::{SessionToken, UserId};

use crate::error::AuthResult;
use crate::types::NewUser;

/// Persistent users and sessions.
///
/// Implementations serialize their own mutations; callers may share one
/// store across connections.
pub trait CredentialStore: Send + Sync {
    /// Register a user and return its freshly generated id.
    ///
    /// Fails with `DuplicateEmail` / `DuplicatePhone` if either is taken.
    fn create_user(&self, user: &NewUser) -> AuthResult<UserId>;

    /// Check an email/password pair. Unknown email and wrong password both
    /// yield `InvalidCredentials`.
    fn authenticate(&self, email: &str, password: &str) -> AuthResult<UserId>;

    /// Issue a new token for `user`.
    fn create_session(&self, user: &UserId) -> AuthResult<SessionToken>;

    /// Map a token back to its user. Empty and unknown tokens are both
    /// `InvalidToken`.
    fn resolve_session(&self, token: &str) -> AuthResult<UserId>;
}
