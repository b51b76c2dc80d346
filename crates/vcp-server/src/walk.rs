use std::io;
use std::path::{Component, Path, PathBuf};

use vcp_protocol::is_partial_file;
use walkdir::WalkDir;

/// A regular file below a served root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServedFile {
    /// Forward-slash path relative to the root.
    pub relative: String,
    pub path: PathBuf,
}

fn to_slash(rel: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            _ => return None,
        }
    }
    Some(parts.join("/"))
}

/// Every regular file below `root`, depth first in name order.
///
/// Symlinks, in-progress receives, and names that are not UTF-8 are left
/// out. A missing root yields no files.
pub fn list_files(root: &Path) -> io::Result<Vec<ServedFile>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry
            .file_name()
            .to_str()
            .map_or(true, is_partial_file)
        {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        if let Some(relative) = to_slash(rel) {
            out.push(ServedFile {
                relative,
                path: entry.path().to_path_buf(),
            });
        }
    }
    Ok(out)
}
