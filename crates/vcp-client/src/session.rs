//! The cached session token at `~/.vcp_session`.

use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use tracing::debug;
use vcp_types::SessionToken;

use crate::error::{ClientError, ClientResult};

/// File name of the token cache in the home directory.
pub const SESSION_FILE: &str = ".vcp_session";

#[derive(Clone, Debug)]
pub struct SessionCache {
    path: PathBuf,
}

impl SessionCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The cache in the current user's home directory.
    pub fn in_home() -> ClientResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| io::Error::new(ErrorKind::NotFound, "home directory not found"))?;
        Ok(Self::new(home.join(SESSION_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The cached token, or `None` if there is no usable one.
    pub fn load(&self) -> ClientResult<Option<SessionToken>> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(SessionToken::new(text.trim()).ok()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Like [`load`](Self::load), but a missing token is an error.
    pub fn require(&self) -> ClientResult<SessionToken> {
        self.load()?.ok_or(ClientError::NotLoggedIn)
    }

    pub fn save(&self, token: &SessionToken) -> ClientResult<()> {
        std::fs::write(&self.path, token.as_str())?;
        debug!(path = %self.path.display(), "session token cached");
        Ok(())
    }
}
