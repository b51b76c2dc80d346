//! Salted one-way password hashing.
//!
//! Stored form: `<salt-hex>$<digest-hex>`, where the digest is BLAKE3 over a
//! fixed domain tag, the salt, and the password bytes. Only lowercase hex
//! ever appears on either side of the `$`.

use crate::token::random_bytes;

const DOMAIN: &[u8] = b"vcp-password-v1:";
const SALT_LEN: usize = 16;

/// Errors from decoding a stored password hash.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PasswordError {
    #[error("malformed stored password hash")]
    Malformed,
}

fn digest(salt: &[u8], password: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(DOMAIN);
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let salt = random_bytes(SALT_LEN);
    format!("{}${}", hex::encode(&salt), digest(&salt, password))
}

/// Check a password against a stored hash.
///
/// Returns `Ok(false)` for a wrong password and `Err` only when the stored
/// value itself is not a hash produced by [`hash_password`].
pub fn verify_password(password: &str, stored: &str) -> Result<bool, PasswordError> {
    let (salt_hex, expected) = stored.split_once('$').ok_or(PasswordError::Malformed)?;
    let salt = hex::decode(salt_hex).map_err(|_| PasswordError::Malformed)?;
    let actual = digest(&salt, password);
    Ok(hex_eq(actual.as_bytes(), expected.as_bytes()))
}

/// Compare two hex strings without an early exit on the first difference.
fn hex_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
