use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    #[error("not logged in; run `vcp login` first")]
    NotLoggedIn,

    /// The server answered with a failure ack and, for auth, its message.
    #[error("server refused: {0}")]
    Refused(String),

    #[error("{0} already exists")]
    DestinationExists(PathBuf),

    #[error("server sent an invalid token")]
    InvalidToken,

    #[error("protocol error: {0}")]
    Protocol(#[from] vcp_protocol::ProtocolError),

    #[error("transfer error: {0}")]
    Transfer(#[from] vcp_protocol::TransferError),

    #[error("store error: {0}")]
    Store(#[from] vcp_store::StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;
