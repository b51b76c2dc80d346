use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("protocol error: {0}")]
    Protocol(#[from] vcp_protocol::ProtocolError),

    #[error("transfer error: {0}")]
    Transfer(#[from] vcp_protocol::TransferError),

    #[error("credential store error: {0}")]
    Auth(#[from] vcp_auth::AuthError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;
