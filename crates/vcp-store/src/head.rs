use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tracing::debug;
use vcp_types::ObjectId;

use crate::error::{StoreError, StoreResult};

/// Name of the pointer file inside `.vcp/`.
pub const HEAD_FILE: &str = "HEAD";

/// Read the current commit hash, or `None` before the first commit.
pub fn read_head(vcp_dir: &Path) -> StoreResult<Option<ObjectId>> {
    let text = match fs::read_to_string(vcp_dir.join(HEAD_FILE)) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let value = text.lines().next().unwrap_or("").trim();
    if value.is_empty() {
        return Ok(None);
    }
    ObjectId::from_hex(value)
        .map(Some)
        .map_err(|_| StoreError::InvalidHead(value.to_string()))
}

/// Point HEAD at `id`.
///
/// The new value is written to a temporary file beside HEAD and renamed over
/// it, so readers observe either the old or the new hash.
pub fn write_head(vcp_dir: &Path, id: &ObjectId) -> StoreResult<()> {
    fs::create_dir_all(vcp_dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(vcp_dir)?;
    writeln!(tmp, "{id}")?;
    tmp.as_file().sync_all()?;
    tmp.persist(vcp_dir.join(HEAD_FILE)).map_err(|e| e.error)?;
    debug!(head = %id, "HEAD updated");
    Ok(())
}
