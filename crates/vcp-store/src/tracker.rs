//! The staged file list at `.vcp/tracker.txt`.
//!
//! ```text
//! <project name>
//! <path> <hash>
//! <dir>/
//! ```
//!
//! Paths are relative to the project root with forward slashes. Directory
//! entries end in `/` and carry no hash. Parsing is lenient: blank and
//! malformed lines are skipped.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::warn;

use crate::error::StoreResult;

/// File name of the tracker inside `.vcp/`.
pub const TRACKER_FILE: &str = "tracker.txt";

/// One staged entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackerEntry<'a> {
    pub path: &'a str,
    /// Empty for directory entries.
    pub hash: &'a str,
}

impl TrackerEntry<'_> {
    pub fn is_dir(&self) -> bool {
        self.path.ends_with('/')
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Tracker {
    project: String,
    entries: BTreeMap<String, String>,
}

impl Tracker {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn parse(text: &str) -> Self {
        let mut lines = text.lines();
        let mut tracker = Self::new(lines.next().unwrap_or("").trim());
        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(path), Some(hash), None) if !path.ends_with('/') => {
                    tracker.entries.insert(path.to_string(), hash.to_string());
                }
                (Some(path), None, None) if path.ends_with('/') => {
                    tracker.entries.insert(path.to_string(), String::new());
                }
                _ => warn!(line, "skipping malformed tracker line"),
            }
        }
        tracker
    }

    pub fn load(path: &Path) -> StoreResult<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    pub fn render(&self) -> String {
        let mut out = format!("{}\n", self.project);
        for (path, hash) in &self.entries {
            if hash.is_empty() {
                out.push_str(&format!("{path}\n"));
            } else {
                out.push_str(&format!("{path} {hash}\n"));
            }
        }
        out
    }

    /// Write the tracker via a sibling temporary file and rename.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(self.render().as_bytes())?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Record a file with its content hash, replacing any previous hash.
    pub fn insert_file(&mut self, path: impl Into<String>, hash: impl Into<String>) {
        self.entries.insert(path.into(), hash.into());
    }

    /// Record a directory. A trailing `/` is added if missing.
    pub fn insert_dir(&mut self, path: &str) {
        let path = if path.ends_with('/') {
            path.to_string()
        } else {
            format!("{path}/")
        };
        self.entries.insert(path, String::new());
    }

    pub fn remove(&mut self, path: &str) -> bool {
        self.entries.remove(path).is_some()
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    /// All entries in path order.
    pub fn entries(&self) -> impl Iterator<Item = TrackerEntry<'_>> {
        self.entries.iter().map(|(path, hash)| TrackerEntry { path, hash })
    }

    /// File entries only.
    pub fn files(&self) -> impl Iterator<Item = TrackerEntry<'_>> {
        self.entries().filter(|e| !e.is_dir())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
