//! Credential store for VCP.
//!
//! Persists users and session tokens, verifies passwords, and resolves
//! tokens back to user ids. Passwords are kept only as salted one-way
//! hashes; tokens are random and never expire.
//!
//! # Backends
//!
//! All backends implement [`CredentialStore`]:
//!
//! - [`SqliteCredentialStore`] -- `users` and `sessions` tables behind one connection lock
//! - [`InMemoryCredentialStore`] -- `HashMap`-based store for tests

pub mod error;
pub mod memory;
pub mod sqlite;
pub mod traits;
pub mod types;

pub use error::{AuthError, AuthResult};
pub use memory::InMemoryCredentialStore;
pub use sqlite::SqliteCredentialStore;
pub use traits::CredentialStore;
pub use types::NewUser;
