use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vcp_protocol::DEFAULT_PORT;
use vcp_types::UserId;

use crate::error::{ServerError, ServerResult};

/// Directory under the data root holding one tree per user.
pub const USERS_DIR: &str = "users";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Root of the served tree. Submissions land in `users/<id>/<project>`.
    pub data_root: PathBuf,
    /// Credential database. Relative paths resolve against `data_root`.
    pub database: PathBuf,
    /// Connections handled at once; further clients wait in the backlog.
    pub max_connections: usize,
    pub log_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            data_root: PathBuf::from("."),
            database: PathBuf::from("vcp_server.db"),
            max_connections: 8,
            log_file: Some(PathBuf::from("server.log")),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.max_connections == 0 {
            return Err(ServerError::Config("max_connections must be at least 1".into()));
        }
        Ok(())
    }

    pub fn users_root(&self) -> PathBuf {
        self.data_root.join(USERS_DIR)
    }

    pub fn user_root(&self, user: &UserId) -> PathBuf {
        self.users_root().join(user.as_str())
    }

    pub fn database_path(&self) -> PathBuf {
        if self.database.is_absolute() {
            self.database.clone()
        } else {
            self.data_root.join(&self.database)
        }
    }
}
