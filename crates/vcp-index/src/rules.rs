use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::debug;

use crate::error::{IndexError, IndexResult};

/// Optional pattern file at the project root, in gitignore syntax.
pub const IGNORE_FILE: &str = ".vcpignore";

/// Decides whether a project-relative path takes part in staging.
///
/// `relative_path` uses forward slashes and has no trailing slash.
pub trait IgnoreRule {
    fn is_ignored(&self, relative_path: &str, is_dir: bool) -> bool;
}

impl<F> IgnoreRule for F
where
    F: Fn(&str, bool) -> bool,
{
    fn is_ignored(&self, relative_path: &str, is_dir: bool) -> bool {
        self(relative_path, is_dir)
    }
}

/// Skips hidden entries (the metadata directory among them) and whatever
/// `.vcpignore` matches.
#[derive(Debug, Default)]
pub struct DefaultIgnore {
    patterns: Option<Gitignore>,
}

impl DefaultIgnore {
    /// Load `.vcpignore` from `root` if present.
    pub fn load(root: &Path) -> IndexResult<Self> {
        let file = root.join(IGNORE_FILE);
        if !file.is_file() {
            return Ok(Self::default());
        }
        let mut builder = GitignoreBuilder::new(root);
        if let Some(err) = builder.add(&file) {
            return Err(IndexError::IgnoreFile(err.to_string()));
        }
        let patterns = builder
            .build()
            .map_err(|e| IndexError::IgnoreFile(e.to_string()))?;
        debug!(patterns = patterns.num_ignores(), "loaded ignore file");
        Ok(Self {
            patterns: Some(patterns),
        })
    }
}

impl IgnoreRule for DefaultIgnore {
    fn is_ignored(&self, relative_path: &str, is_dir: bool) -> bool {
        // Covers `.vcp/` too.
        if relative_path.split('/').any(|c| c.starts_with('.')) {
            return true;
        }
        self.patterns.as_ref().is_some_and(|p| {
            p.matched_path_or_any_parents(relative_path, is_dir)
                .is_ignore()
        })
    }
}
