use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDateTime;
use tracing::{info, warn};
use vcp_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::head;
use crate::loose::LooseObjectStore;
use crate::object::{Commit, EntryMode, ObjectKind, StoredObject, Tree, TreeEntry};
use crate::tracker::{Tracker, TRACKER_FILE};
use crate::traits::ObjectStore;

/// Metadata directory at the root of every project.
pub const VCP_DIR: &str = ".vcp";

/// Object directory inside [`VCP_DIR`].
pub const OBJECTS_DIR: &str = "objects";

/// `<name>_<YYYYmmdd>_<HHMM>`, the project name recorded by `init`.
pub fn stamped_project_name(name: &str, at: NaiveDateTime) -> String {
    format!("{name}_{}", at.format("%Y%m%d_%H%M"))
}

fn check_signature(field: &'static str, value: &str) -> StoreResult<()> {
    if value.contains(['\n', '\r']) {
        return Err(StoreError::InvalidSignature {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// A project working directory with its `.vcp/` metadata.
///
/// Clones share one commit lock, so commits made through any clone of a
/// handle are serialized.
#[derive(Debug, Clone)]
pub struct Repository {
    root: PathBuf,
    vcp_dir: PathBuf,
    objects: LooseObjectStore,
    lock: Arc<Mutex<()>>,
}

impl Repository {
    fn at(root: &Path) -> Self {
        let vcp_dir = root.join(VCP_DIR);
        Self {
            root: root.to_path_buf(),
            objects: LooseObjectStore::new(vcp_dir.join(OBJECTS_DIR)),
            lock: Arc::default(),
            vcp_dir,
        }
    }

    /// Create `.vcp/` under `root` and write a tracker naming `project`.
    pub fn init(root: &Path, project: &str) -> StoreResult<Self> {
        let tracker_path = root.join(VCP_DIR).join(TRACKER_FILE);
        if tracker_path.exists() {
            return Err(StoreError::AlreadyInitialized(root.to_path_buf()));
        }
        fs::create_dir_all(root.join(VCP_DIR).join(OBJECTS_DIR))?;
        let repo = Self::at(root);
        repo.save_tracker(&Tracker::new(project))?;
        info!(root = %root.display(), project, "project initialized");
        Ok(repo)
    }

    /// Open an existing project rooted exactly at `root`.
    pub fn open(root: &Path) -> StoreResult<Self> {
        if !root.join(VCP_DIR).join(TRACKER_FILE).is_file() {
            return Err(StoreError::NotARepository(root.to_path_buf()));
        }
        Ok(Self::at(root))
    }

    /// Open the nearest project at or above `start`.
    pub fn discover(start: &Path) -> StoreResult<Self> {
        start
            .ancestors()
            .find(|dir| dir.join(VCP_DIR).join(TRACKER_FILE).is_file())
            .map(Self::at)
            .ok_or_else(|| StoreError::NotARepository(start.to_path_buf()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn vcp_dir(&self) -> &Path {
        &self.vcp_dir
    }

    pub fn tracker_path(&self) -> PathBuf {
        self.vcp_dir.join(TRACKER_FILE)
    }

    pub fn objects(&self) -> &LooseObjectStore {
        &self.objects
    }

    pub fn tracker(&self) -> StoreResult<Tracker> {
        Tracker::load(&self.tracker_path())
    }

    pub fn save_tracker(&self, tracker: &Tracker) -> StoreResult<()> {
        tracker.save(&self.tracker_path())
    }

    /// Store `content` as an object of `kind` and return its hash.
    pub fn store(&self, kind: ObjectKind, content: Vec<u8>) -> StoreResult<ObjectId> {
        self.objects.write(&StoredObject::new(kind, content))
    }

    /// Build and store a tree from the file entries of a tracker.
    ///
    /// The first line (project name) and directory entries are not part of
    /// the tree. Entries whose hash does not parse are skipped.
    pub fn write_tree_from_tracker(&self, tracker_path: &Path) -> StoreResult<ObjectId> {
        let tracker = Tracker::load(tracker_path)?;
        let mut entries = Vec::new();
        for entry in tracker.files() {
            match ObjectId::from_hex(entry.hash) {
                Ok(id) => entries.push(TreeEntry::new(EntryMode::Regular, entry.path, id)),
                Err(e) => warn!(path = entry.path, error = %e, "skipping tracker entry"),
            }
        }
        self.objects.write(&Tree::new(entries).to_stored_object())
    }

    /// Store a commit. An empty `parents` slice makes a root commit.
    ///
    /// `author` and `committer` must not contain line breaks.
    pub fn write_commit(
        &self,
        tree: ObjectId,
        parents: &[ObjectId],
        author: &str,
        committer: &str,
        message: &str,
    ) -> StoreResult<ObjectId> {
        check_signature("author", author)?;
        check_signature("committer", committer)?;
        let commit = Commit {
            tree,
            parents: parents.to_vec(),
            author: author.to_string(),
            committer: committer.to_string(),
            message: message.to_string(),
        };
        self.objects.write(&commit.to_stored_object())
    }

    pub fn read_commit(&self, id: &ObjectId) -> StoreResult<Commit> {
        let obj = self.objects.read(id)?.ok_or(StoreError::NotFound(*id))?;
        Commit::from_stored_object(&obj)
    }

    pub fn read_tree(&self, id: &ObjectId) -> StoreResult<Tree> {
        let obj = self.objects.read(id)?.ok_or(StoreError::NotFound(*id))?;
        Tree::from_stored_object(&obj)
    }

    pub fn read_head(&self) -> StoreResult<Option<ObjectId>> {
        head::read_head(&self.vcp_dir)
    }

    pub fn write_head(&self, id: &ObjectId) -> StoreResult<()> {
        head::write_head(&self.vcp_dir, id)
    }

    /// Snapshot the tracker as a new commit on top of HEAD and move HEAD.
    ///
    /// Runs under the handle's commit lock, so two commits through clones
    /// of one handle cannot both read the same parent.
    pub fn commit(&self, author: &str, message: &str) -> StoreResult<ObjectId> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let tree = self.write_tree_from_tracker(&self.tracker_path())?;
        let parents: Vec<ObjectId> = self.read_head()?.into_iter().collect();
        let id = self.write_commit(tree, &parents, author, author, message)?;
        self.write_head(&id)?;
        info!(commit = %id, tree = %tree, "committed");
        Ok(id)
    }

    /// Up to `limit` commits from HEAD, newest first, following first parents.
    pub fn history(&self, limit: usize) -> StoreResult<Vec<(ObjectId, Commit)>> {
        let mut out = Vec::new();
        let mut next = self.read_head()?;
        while let Some(id) = next {
            if out.len() >= limit {
                break;
            }
            let commit = self.read_commit(&id)?;
            next = commit.parents.first().copied();
            out.push((id, commit));
        }
        Ok(out)
    }
}
