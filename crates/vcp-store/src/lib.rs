//! Content-addressed object storage for VCP projects.
//!
//! A project keeps its local history under `<project>/.vcp/`:
//!
//! ```text
//! .vcp/
//!   tracker.txt          project name, then one `path hash` line per staged entry
//!   HEAD                 hash of the most recent commit
//!   objects/ab/cdef...   encoded records keyed by digest
//! ```
//!
//! # Object Types
//!
//! Every object is stored as `"<type> <len>\0<content>"` and identified by
//! the BLAKE3 digest of that whole record.
//!
//! - [`Blob`] -- raw file bytes
//! - [`Tree`] -- `"<mode> <path> <hash>"` lines, one per tracked file
//! - [`Commit`] -- tree, parents, author, committer, message
//!
//! # Storage
//!
//! Backends implement the [`ObjectStore`] trait. [`LooseObjectStore`] keeps
//! one file per object under `objects/`.

pub mod error;
pub mod head;
pub mod loose;
pub mod object;
pub mod repo;
pub mod tracker;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use head::{read_head, write_head, HEAD_FILE};
pub use loose::LooseObjectStore;
pub use object::{Blob, Commit, EntryMode, ObjectKind, StoredObject, Tree, TreeEntry};
pub use repo::{stamped_project_name, Repository, OBJECTS_DIR, VCP_DIR};
pub use tracker::{Tracker, TrackerEntry, TRACKER_FILE};
pub use traits::ObjectStore;
