//! Wire protocol for VCP.
//!
//! Every protocol element on the TCP stream is one of:
//!
//! - a **frame**: 4-byte big-endian length followed by that many raw bytes
//! - an **ack**: a bare 4-byte big-endian integer, `1` for success
//! - a **file stream**: 8-byte big-endian size followed by exactly that
//!   many raw bytes, written and read in bounded chunks
//!
//! All reads and writes loop until the full element has been transferred;
//! a peer that closes early yields [`ProtocolError::ConnectionClosed`].

pub mod codec;
pub mod command;
pub mod error;
pub mod names;
pub mod transfer;

pub use codec::{
    recv_ack, recv_frame, recv_string, send_ack, send_end, send_frame, ACK_FAIL, ACK_OK,
    MAX_FRAME_LEN,
};
pub use command::{AuthCommand, Command};
pub use error::{ProtocolError, ProtocolResult, TransferError, TransferResult};
pub use names::{is_partial_file, validate_project_name, validate_relative_path, MAX_PROJECT_NAME_LEN};
pub use transfer::{drain_file, recv_file, send_file, OutgoingFile, Progress, Silent, CHUNK_SIZE};

/// Well-known TCP port.
pub const DEFAULT_PORT: u16 = 8080;
