use std::fmt;
use std::str::FromStr;

use vcp_crypto::ContentHasher;
use vcp_types::ObjectId;

use crate::error::{StoreError, StoreResult};

/// The kind of object stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Raw file bytes.
    Blob,
    /// Listing of tracked files.
    Tree,
    /// Snapshot metadata pointing at a tree.
    Commit,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blob" => Ok(Self::Blob),
            "tree" => Ok(Self::Tree),
            "commit" => Ok(Self::Commit),
            other => Err(StoreError::MalformedRecord(format!(
                "unknown object type {other:?}"
            ))),
        }
    }
}

/// A stored object: kind tag + content.
///
/// `StoredObject` is the unit of storage. Its on-disk form is the encoded
/// record `"<kind> <len>\0<data>"`, and its id is the digest of that record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub kind: ObjectKind,
    pub data: Vec<u8>,
}

impl StoredObject {
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        Self { kind, data }
    }

    /// Encode as `"<kind> <len>\0<data>"`.
    pub fn encode(&self) -> Vec<u8> {
        let header = format!("{} {}\0", self.kind, self.data.len());
        let mut out = Vec::with_capacity(header.len() + self.data.len());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(&self.data);
        out
    }

    /// Decode an encoded record, checking the declared length.
    pub fn decode(record: &[u8]) -> StoreResult<Self> {
        let nul = record
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| StoreError::MalformedRecord("missing header terminator".into()))?;
        let header = std::str::from_utf8(&record[..nul])
            .map_err(|_| StoreError::MalformedRecord("header is not UTF-8".into()))?;
        let (kind, len) = header
            .split_once(' ')
            .ok_or_else(|| StoreError::MalformedRecord(format!("bad header {header:?}")))?;
        let kind: ObjectKind = kind.parse()?;
        let len: usize = len
            .parse()
            .map_err(|_| StoreError::MalformedRecord(format!("bad length {len:?}")))?;
        let data = &record[nul + 1..];
        if data.len() != len {
            return Err(StoreError::MalformedRecord(format!(
                "declared {len} bytes, found {}",
                data.len()
            )));
        }
        Ok(Self::new(kind, data.to_vec()))
    }

    /// Content-addressed id: digest of the encoded record.
    pub fn compute_id(&self) -> ObjectId {
        ContentHasher::hash(&self.encode())
    }

    fn expect_kind(&self, kind: ObjectKind) -> StoreResult<()> {
        if self.kind != kind {
            return Err(StoreError::CorruptObject {
                id: self.compute_id(),
                reason: format!("expected {kind}, got {}", self.kind),
            });
        }
        Ok(())
    }

    fn text(&self) -> StoreResult<&str> {
        std::str::from_utf8(&self.data).map_err(|_| StoreError::CorruptObject {
            id: self.compute_id(),
            reason: format!("{} content is not UTF-8", self.kind),
        })
    }
}

// ---------------------------------------------------------------------------
// Blob
// ---------------------------------------------------------------------------

/// Raw file content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Blob, self.data.clone())
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.expect_kind(ObjectKind::Blob)?;
        Ok(Self {
            data: obj.data.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// File mode for a tree entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryMode {
    /// Normal file (0o100644).
    Regular,
    /// Executable file (0o100755).
    Executable,
}

impl EntryMode {
    pub fn mode_bits(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
        }
    }

    pub fn from_mode_bits(bits: u32) -> Option<Self> {
        match bits {
            0o100644 => Some(Self::Regular),
            0o100755 => Some(Self::Executable),
            _ => None,
        }
    }
}

impl fmt::Display for EntryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06o}", self.mode_bits())
    }
}

/// A single `"<mode> <path> <hash>"` line of a tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: EntryMode,
    /// Forward-slash path relative to the project root.
    pub path: String,
    pub object_id: ObjectId,
}

impl TreeEntry {
    pub fn new(mode: EntryMode, path: impl Into<String>, object_id: ObjectId) -> Self {
        Self {
            mode,
            path: path.into(),
            object_id,
        }
    }
}

impl PartialOrd for TreeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TreeEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.path.cmp(&other.path)
    }
}

/// Flat listing of tracked files.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Tree {
    /// Entries sorted by path.
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Entries are sorted by path for deterministic hashing.
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort();
        Self { entries }
    }

    pub fn to_stored_object(&self) -> StoredObject {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&format!("{} {} {}\n", entry.mode, entry.path, entry.object_id));
        }
        StoredObject::new(ObjectKind::Tree, out.into_bytes())
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.expect_kind(ObjectKind::Tree)?;
        let corrupt = |reason: String| StoreError::CorruptObject {
            id: obj.compute_id(),
            reason,
        };
        let mut entries = Vec::new();
        for line in obj.text()?.lines().filter(|l| !l.is_empty()) {
            let mut parts = line.splitn(3, ' ');
            let (Some(mode), Some(path), Some(hash)) = (parts.next(), parts.next(), parts.next())
            else {
                return Err(corrupt(format!("bad tree line {line:?}")));
            };
            let mode = u32::from_str_radix(mode, 8)
                .ok()
                .and_then(EntryMode::from_mode_bits)
                .ok_or_else(|| corrupt(format!("bad mode {mode:?}")))?;
            let object_id =
                ObjectId::from_hex(hash).map_err(|e| corrupt(format!("bad hash: {e}")))?;
            entries.push(TreeEntry::new(mode, path, object_id));
        }
        Ok(Self { entries })
    }

    pub fn get(&self, path: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// A commit record.
///
/// Encoded as:
///
/// ```text
/// tree <hash>
/// parent <hash>        (zero or more)
/// author <str>
/// committer <str>
///
/// <message>
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    pub tree: ObjectId,
    /// Empty for a root commit.
    pub parents: Vec<ObjectId>,
    pub author: String,
    pub committer: String,
    pub message: String,
}

impl Commit {
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn to_stored_object(&self) -> StoredObject {
        let mut out = format!("tree {}\n", self.tree);
        for parent in &self.parents {
            out.push_str(&format!("parent {parent}\n"));
        }
        out.push_str(&format!(
            "author {}\ncommitter {}\n\n{}\n",
            self.author, self.committer, self.message
        ));
        StoredObject::new(ObjectKind::Commit, out.into_bytes())
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.expect_kind(ObjectKind::Commit)?;
        let corrupt = |reason: &str| StoreError::CorruptObject {
            id: obj.compute_id(),
            reason: reason.to_string(),
        };
        let text = obj.text()?;
        let (headers, message) = text
            .split_once("\n\n")
            .ok_or_else(|| corrupt("missing blank line before message"))?;

        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;
        for line in headers.lines() {
            let (key, value) = line.split_once(' ').unwrap_or((line, ""));
            match key {
                "tree" => {
                    tree = Some(ObjectId::from_hex(value).map_err(|_| corrupt("bad tree hash"))?)
                }
                "parent" => parents
                    .push(ObjectId::from_hex(value).map_err(|_| corrupt("bad parent hash"))?),
                "author" => author = Some(value.to_string()),
                "committer" => committer = Some(value.to_string()),
                _ => return Err(corrupt("unknown commit header")),
            }
        }

        Ok(Self {
            tree: tree.ok_or_else(|| corrupt("missing tree"))?,
            parents,
            author: author.ok_or_else(|| corrupt("missing author"))?,
            committer: committer.ok_or_else(|| corrupt("missing committer"))?,
            message: message.strip_suffix('\n').unwrap_or(message).to_string(),
        })
    }
}
