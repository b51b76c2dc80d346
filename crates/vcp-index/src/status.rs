//! Working tree compared with the tracker.

use std::collections::BTreeSet;

use vcp_crypto::ContentHasher;
use vcp_store::Repository;
use walkdir::WalkDir;

use crate::error::IndexResult;
use crate::rules::IgnoreRule;
use crate::stage::{relative_slash_path, unstageable};

/// Differences between the working tree and the last staged state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkdirStatus {
    /// Files and directories (with trailing `/`) not yet in the tracker.
    pub new: Vec<String>,
    /// Tracked files whose content hash changed.
    pub modified: Vec<String>,
    /// Tracked files no longer present.
    pub deleted: Vec<String>,
}

impl WorkdirStatus {
    /// Returns `true` if there are no changes of any kind.
    pub fn is_clean(&self) -> bool {
        self.new.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

/// Walk the project and compare each entry with the tracker.
///
/// Unreadable files, and files `stage` would refuse, are left out of the
/// comparison.
pub fn status(repo: &Repository, rule: &dyn IgnoreRule) -> IndexResult<WorkdirStatus> {
    let root = repo.root().canonicalize()?;
    let tracker = repo.tracker()?;
    let mut out = WorkdirStatus::default();
    let mut seen = BTreeSet::new();

    let walker = WalkDir::new(&root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| match relative_slash_path(&root, entry.path()) {
            Some(rel) => !rule.is_ignored(&rel, entry.file_type().is_dir()),
            None => true,
        });

    for entry in walker {
        let entry = entry?;
        let Some(rel) = relative_slash_path(&root, entry.path()) else {
            continue;
        };
        if entry.file_type().is_dir() {
            let dir = format!("{rel}/");
            if tracker.get(&dir).is_none() {
                out.new.push(dir);
            }
        } else if entry.file_type().is_file() {
            let refused = entry
                .metadata()
                .map_or(true, |meta| unstageable(entry.path(), &meta).is_some());
            if refused {
                continue;
            }
            let Ok(id) = ContentHasher::hash_file(entry.path()) else {
                continue;
            };
            match tracker.get(&rel) {
                None => out.new.push(rel.clone()),
                Some(hash) if hash != id.to_hex() => out.modified.push(rel.clone()),
                Some(_) => {}
            }
            seen.insert(rel);
        }
    }

    out.deleted = tracker
        .files()
        .filter(|e| !seen.contains(e.path) && !root.join(e.path).exists())
        .map(|e| e.path.to_string())
        .collect();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::DefaultIgnore;
    use crate::stage::stage;
    use std::fs;

    #[test]
    fn new_modified_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path(), "demo").unwrap();
        let rule = DefaultIgnore::default();

        fs::write(dir.path().join("keep.txt"), b"1").unwrap();
        fs::write(dir.path().join("edit.txt"), b"1").unwrap();
        fs::write(dir.path().join("gone.txt"), b"1").unwrap();
        stage(&repo, dir.path(), &rule).unwrap();
        assert!(status(&repo, &rule).unwrap().is_clean());

        fs::write(dir.path().join("edit.txt"), b"2").unwrap();
        fs::remove_file(dir.path().join("gone.txt")).unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/new.md"), b"n").unwrap();
        fs::write(dir.path().join("docs/LICENSE"), b"n").unwrap();

        let st = status(&repo, &rule).unwrap();
        assert_eq!(st.new, vec!["docs/", "docs/new.md"]);
        assert_eq!(st.modified, vec!["edit.txt"]);
        assert_eq!(st.deleted, vec!["gone.txt"]);
    }
}
