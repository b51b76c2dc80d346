use rand::RngCore;
use vcp_types::{SessionToken, UserId};

/// Bytes of entropy in a session token (128 bits).
pub const SESSION_TOKEN_BYTES: usize = 16;

/// Bytes of entropy in a user id.
pub const USER_ID_BYTES: usize = 16;

pub(crate) fn random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}

/// `len` random bytes, hex-encoded.
fn random_hex(len: usize) -> String {
    hex::encode(random_bytes(len))
}

/// Generate a fresh opaque session token.
pub fn new_session_token() -> SessionToken {
    SessionToken::new(random_hex(SESSION_TOKEN_BYTES)).expect("hex of non-zero length is never empty")
}

/// Generate a fresh opaque user id.
pub fn new_user_id() -> UserId {
    UserId::new(random_hex(USER_ID_BYTES)).expect("hex is a valid user id")
}
