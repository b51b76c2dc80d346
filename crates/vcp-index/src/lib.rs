//! Staging for VCP projects.
//!
//! Walks the working tree, hashes regular files, and records them in the
//! project's tracker. Which paths take part is decided by an
//! [`IgnoreRule`].
//!
//! # Key Types
//!
//! - [`IgnoreRule`] -- predicate over project-relative paths
//! - [`DefaultIgnore`] -- skips `.vcp/`, hidden entries, and `.vcpignore` patterns
//! - [`StageReport`] -- what `stage` recorded and what it skipped
//! - [`WorkdirStatus`] -- working tree compared with the tracker

pub mod error;
pub mod rules;
pub mod stage;
pub mod status;

pub use error::{IndexError, IndexResult};
pub use rules::{DefaultIgnore, IgnoreRule, IGNORE_FILE};
pub use stage::{relative_slash_path, stage, unstageable, StageReport};
pub use status::{status, WorkdirStatus};
