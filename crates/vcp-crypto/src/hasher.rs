use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use vcp_types::ObjectId;

/// Read size used when hashing files.
const READ_BUF: usize = 8192;

/// BLAKE3 content hasher.
///
/// Object ids are computed over the whole encoded record, so no domain tag
/// is mixed in here: the `"<type> <len>\0"` header already separates kinds.
pub struct ContentHasher;

impl ContentHasher {
    /// Hash a byte slice.
    pub fn hash(data: &[u8]) -> ObjectId {
        ObjectId::digest(data)
    }

    /// Hash everything a reader yields.
    pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<ObjectId> {
        let mut hasher = blake3::Hasher::new();
        let mut buf = [0u8; READ_BUF];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(ObjectId::from_hash(*hasher.finalize().as_bytes()))
    }

    /// Hash a file's contents, streaming it in fixed-size reads.
    pub fn hash_file(path: &Path) -> io::Result<ObjectId> {
        Self::hash_reader(File::open(path)?)
    }
}
