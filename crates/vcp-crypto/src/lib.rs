//! Cryptographic primitives for VCP.
//!
//! Provides BLAKE3 content digests for objects and tracked files, salted
//! password hashing for the credential store, and random identifiers for
//! users and sessions.
//!
//! Digests come from `blake3`; salts, tokens and ids from `rand`.

pub mod hasher;
pub mod password;
pub mod token;

pub use hasher::ContentHasher;
pub use password::{hash_password, verify_password, PasswordError};
pub use token::{new_session_token, new_user_id};
