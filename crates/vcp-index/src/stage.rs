use std::fs::Metadata;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use vcp_crypto::ContentHasher;
use vcp_store::Repository;
use walkdir::WalkDir;

use crate::error::{IndexError, IndexResult};
use crate::rules::IgnoreRule;

/// Outcome of one `stage` call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Files recorded with a fresh hash.
    pub files: Vec<String>,
    /// Directories recorded.
    pub dirs: Vec<String>,
    /// Paths left out, with the reason.
    pub skipped: Vec<(String, String)>,
}

impl StageReport {
    fn skip(&mut self, path: impl Into<String>, reason: impl Into<String>) {
        let (path, reason) = (path.into(), reason.into());
        warn!(path = %path, reason = %reason, "not staged");
        self.skipped.push((path, reason));
    }
}

/// `path` relative to `root` with `/` separators, or `None` if `path` is not
/// strictly inside `root`.
pub fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?.to_string()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Why a regular file is never staged, whatever the ignore rule says.
///
/// Executables (any execute bit set) and files without an extension are
/// left out, so build outputs and scripts do not reach the server.
pub fn unstageable(path: &Path, metadata: &Metadata) -> Option<&'static str> {
    if is_executable(metadata) {
        return Some("executable file");
    }
    if path.extension().is_none() {
        return Some("no file extension");
    }
    None
}

#[cfg(unix)]
fn is_executable(metadata: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &Metadata) -> bool {
    false
}

fn absolutize(path: &Path) -> IndexResult<PathBuf> {
    if !path.exists() {
        return Err(IndexError::PathNotFound(path.to_path_buf()));
    }
    Ok(path.canonicalize()?)
}

/// Hash and record `target` (a file, or every file below a directory) in the
/// project's tracker.
///
/// Ignored entries are pruned. Paths containing whitespace cannot be
/// represented in the tracker and are skipped, as are unreadable files and
/// files refused by [`unstageable`]. Naming such a file directly is an error.
pub fn stage(repo: &Repository, target: &Path, rule: &dyn IgnoreRule) -> IndexResult<StageReport> {
    let root = absolutize(repo.root())?;
    let target = absolutize(target)?;
    if !target.starts_with(&root) {
        return Err(IndexError::OutsideProject(target));
    }

    let mut tracker = repo.tracker()?;
    let mut report = StageReport::default();

    let walker = WalkDir::new(&target)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| match relative_slash_path(&root, entry.path()) {
            Some(rel) => !rule.is_ignored(&rel, entry.file_type().is_dir()),
            None => true,
        });

    for entry in walker {
        let entry = entry?;
        let Some(rel) = relative_slash_path(&root, entry.path()) else {
            // The project root itself.
            continue;
        };
        if rel.chars().any(char::is_whitespace) {
            report.skip(rel, "path contains whitespace");
            continue;
        }
        let file_type = entry.file_type();
        if file_type.is_dir() {
            tracker.insert_dir(&rel);
            report.dirs.push(rel);
        } else if file_type.is_file() {
            if let Some(reason) = unstageable(entry.path(), &entry.metadata()?) {
                if entry.depth() == 0 {
                    return Err(IndexError::Unstageable { path: target, reason });
                }
                report.skip(rel, reason);
                continue;
            }
            match ContentHasher::hash_file(entry.path()) {
                Ok(id) => {
                    debug!(path = %rel, hash = %id.short_hex(), "staged");
                    tracker.insert_file(rel.clone(), id.to_hex());
                    report.files.push(rel);
                }
                Err(e) => report.skip(rel, e.to_string()),
            }
        } else if entry.depth() == 0 {
            return Err(IndexError::UnsupportedType(target));
        } else {
            report.skip(rel, "not a regular file");
        }
    }

    repo.save_tracker(&tracker)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::DefaultIgnore;
    use std::fs;

    fn project() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path(), "demo").unwrap();
        (dir, repo)
    }

    #[test]
    fn relative_paths() {
        let root = Path::new("/p");
        assert_eq!(relative_slash_path(root, Path::new("/p/a/b.txt")).as_deref(), Some("a/b.txt"));
        assert_eq!(relative_slash_path(root, Path::new("/p")), None);
        assert_eq!(relative_slash_path(root, Path::new("/q/a")), None);
    }

    #[test]
    fn stage_single_file() {
        let (dir, repo) = project();
        fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        let report = stage(&repo, &dir.path().join("a.txt"), &DefaultIgnore::default()).unwrap();
        assert_eq!(report.files, vec!["a.txt"]);

        let tracker = repo.tracker().unwrap();
        assert_eq!(tracker.project(), "demo");
        assert_eq!(
            tracker.get("a.txt"),
            Some(ContentHasher::hash(b"hello").to_hex().as_str())
        );
    }

    #[test]
    fn stage_directory_records_dirs_and_skips_hidden() {
        let (dir, repo) = project();
        fs::create_dir_all(dir.path().join("src/util")).unwrap();
        fs::write(dir.path().join("src/main.rs"), b"fn main() {}").unwrap();
        fs::write(dir.path().join("src/util/mod.rs"), b"").unwrap();
        fs::write(dir.path().join(".secret"), b"x").unwrap();

        let report = stage(&repo, dir.path(), &DefaultIgnore::default()).unwrap();
        assert_eq!(report.files, vec!["src/main.rs", "src/util/mod.rs"]);
        assert_eq!(report.dirs, vec!["src", "src/util"]);

        let tracker = repo.tracker().unwrap();
        assert!(tracker.get("src/").is_some());
        assert!(tracker.get(".secret").is_none());
        assert!(tracker.entries().all(|e| !e.path.starts_with(".vcp")));
    }

    #[test]
    fn ignore_file_prunes_directories() {
        let (dir, repo) = project();
        fs::write(dir.path().join(".vcpignore"), "build/\n").unwrap();
        fs::create_dir_all(dir.path().join("build")).unwrap();
        fs::write(dir.path().join("build/out.bin"), b"x").unwrap();
        fs::write(dir.path().join("keep.txt"), b"y").unwrap();

        let rule = DefaultIgnore::load(dir.path()).unwrap();
        let report = stage(&repo, dir.path(), &rule).unwrap();
        assert_eq!(report.files, vec!["keep.txt"]);
        assert!(report.dirs.is_empty());
    }

    #[test]
    fn whitespace_paths_are_skipped() {
        let (dir, repo) = project();
        fs::write(dir.path().join("my notes.txt"), b"x").unwrap();
        let report = stage(&repo, dir.path(), &DefaultIgnore::default()).unwrap();
        assert!(report.files.is_empty());
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn extensionless_files_are_skipped() {
        let (dir, repo) = project();
        fs::write(dir.path().join("Makefile"), b"all:").unwrap();
        fs::write(dir.path().join("notes.md"), b"x").unwrap();

        let report = stage(&repo, dir.path(), &DefaultIgnore::default()).unwrap();
        assert_eq!(report.files, vec!["notes.md"]);
        assert_eq!(
            report.skipped,
            vec![("Makefile".to_string(), "no file extension".to_string())]
        );
        assert!(matches!(
            stage(&repo, &dir.path().join("Makefile"), &DefaultIgnore::default()),
            Err(IndexError::Unstageable { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn executables_are_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, repo) = project();
        let script = dir.path().join("build.sh");
        fs::write(&script, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        fs::write(dir.path().join("lib.rs"), b"").unwrap();

        let report = stage(&repo, dir.path(), &DefaultIgnore::default()).unwrap();
        assert_eq!(report.files, vec!["lib.rs"]);
        assert_eq!(report.skipped[0].1, "executable file");
        assert!(repo.tracker().unwrap().get("build.sh").is_none());

        let err = stage(&repo, &script, &DefaultIgnore::default()).unwrap_err();
        assert!(matches!(err, IndexError::Unstageable { reason: "executable file", .. }));
    }

    #[test]
    fn restaging_updates_hash() {
        let (dir, repo) = project();
        let file = dir.path().join("a.txt");
        fs::write(&file, b"one").unwrap();
        stage(&repo, &file, &DefaultIgnore::default()).unwrap();
        fs::write(&file, b"two").unwrap();
        stage(&repo, &file, &DefaultIgnore::default()).unwrap();
        let tracker = repo.tracker().unwrap();
        assert_eq!(tracker.len(), 1);
        assert_eq!(
            tracker.get("a.txt"),
            Some(ContentHasher::hash(b"two").to_hex().as_str())
        );
    }

    #[test]
    fn missing_and_outside_paths() {
        let (dir, repo) = project();
        assert!(matches!(
            stage(&repo, &dir.path().join("nope"), &DefaultIgnore::default()),
            Err(IndexError::PathNotFound(_))
        ));
        let other = tempfile::tempdir().unwrap();
        assert!(matches!(
            stage(&repo, other.path(), &DefaultIgnore::default()),
            Err(IndexError::OutsideProject(_))
        ));
    }
}
