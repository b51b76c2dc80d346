/// Errors from credential store operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("phone number already registered")]
    DuplicatePhone,

    /// Unknown email or wrong password. The two are not distinguished.
    #[error("unknown email or wrong password")]
    InvalidCredentials,

    /// Empty, unknown, or malformed session token.
    #[error("invalid session token")]
    InvalidToken,

    #[error("{0} must not be empty")]
    MissingField(&'static str),

    /// A stored row that cannot be interpreted.
    #[error("corrupt credential record: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl AuthError {
    /// Whether the failure is the caller's fault rather than the store's.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Corrupt(_) | Self::Database(_))
    }
}

/// Result alias for credential store operations.
pub type AuthResult<T> = Result<T, AuthError>;
