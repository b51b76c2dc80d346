use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Opaque identifier assigned to a user at signup.
///
/// Also names the user's directory on the server (`users/<user_id>/`), so it
/// is restricted to ASCII alphanumerics and `-`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.is_empty() {
            return Err(TypeError::Empty);
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(TypeError::InvalidIdentifier(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque session credential.
///
/// `Debug` never prints the token itself.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a token string. Empty tokens are never valid.
    pub fn new(token: impl Into<String>) -> Result<Self, TypeError> {
        let token = token.into();
        if token.is_empty() {
            return Err(TypeError::Empty);
        }
        Ok(Self(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_rejects_path_characters() {
        assert!(UserId::new("3f2a9c").is_ok());
        assert!(UserId::new("").is_err());
        assert!(UserId::new("../root").is_err());
        assert!(UserId::new("a/b").is_err());
    }

    #[test]
    fn empty_token_is_rejected() {
        assert_eq!(SessionToken::new(""), Err(TypeError::Empty));
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = SessionToken::new("deadbeef").unwrap();
        assert!(!format!("{token:?}").contains("deadbeef"));
        assert_eq!(token.as_str(), "deadbeef");
    }
}
