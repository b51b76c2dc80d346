use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};
use vcp_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;
use crate::traits::ObjectStore;

/// One file per object at `<objects>/<hex[0..2]>/<hex[2..]>`.
///
/// Each file holds the encoded record verbatim. New objects are written to a
/// temporary file in the fan-out directory and linked into place without
/// clobbering, so a reader never sees a partially written object and racing
/// writers of the same content converge.
#[derive(Debug, Clone)]
pub struct LooseObjectStore {
    root: PathBuf,
}

impl LooseObjectStore {
    /// Use `root` as the `objects/` directory. Nothing is created until the
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the object with `id` lives (or would live).
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        self.root.join(id.fanout_path())
    }
}

impl ObjectStore for LooseObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        let record = match fs::read(self.object_path(id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let computed = ObjectId::digest(&record);
        if computed != *id {
            return Err(StoreError::HashMismatch { id: *id, computed });
        }
        let object = StoredObject::decode(&record).map_err(|e| StoreError::CorruptObject {
            id: *id,
            reason: e.to_string(),
        })?;
        Ok(Some(object))
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let record = object.encode();
        let id = ObjectId::digest(&record);
        let path = self.object_path(&id);
        if path.exists() {
            trace!(%id, "object already present");
            return Ok(id);
        }

        let dir = path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "object path has no parent"))?;
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&record)?;
        tmp.as_file().sync_all()?;
        match tmp.persist_noclobber(&path) {
            Ok(_) => debug!(%id, kind = %object.kind, bytes = record.len(), "object written"),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                trace!(%id, "object written concurrently");
            }
            Err(e) => return Err(e.error.into()),
        }
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.object_path(id).is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Blob, ObjectKind};

    #[test]
    fn fanout_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = LooseObjectStore::new(dir.path().join("objects"));
        let id = store.write(&Blob::new(b"hello".to_vec()).to_stored_object()).unwrap();

        let hex = id.to_hex();
        let path = dir.path().join("objects").join(&hex[..2]).join(&hex[2..]);
        assert_eq!(fs::read(path).unwrap(), b"blob 5\0hello");
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = LooseObjectStore::new(dir.path());
        let obj = StoredObject::new(ObjectKind::Tree, b"100644 a x\n".to_vec());
        let id = store.write(&obj).unwrap();
        assert!(store.exists(&id).unwrap());
        assert_eq!(store.read(&id).unwrap(), Some(obj));
    }

    #[test]
    fn identical_write_does_not_touch_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LooseObjectStore::new(dir.path());
        let obj = Blob::new(b"same".to_vec()).to_stored_object();
        let first = store.write(&obj).unwrap();
        let path = store.object_path(&first);
        let before = fs::metadata(&path).unwrap().modified().unwrap();

        let second = store.write(&obj).unwrap();
        assert_eq!(first, second);
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), before);
        assert_eq!(fs::read(&path).unwrap(), obj.encode());
    }

    #[test]
    fn concurrent_identical_writes_converge() {
        let dir = tempfile::tempdir().unwrap();
        let store = LooseObjectStore::new(dir.path());
        let obj = Blob::new(vec![9u8; 4096]).to_stored_object();
        let (store_ref, obj_ref) = (&store, &obj);
        let ids: Vec<ObjectId> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(move || store_ref.write(obj_ref).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(store.read(&ids[0]).unwrap(), Some(obj));
    }

    #[test]
    fn missing_object_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = LooseObjectStore::new(dir.path());
        let id = ObjectId::digest(b"absent");
        assert_eq!(store.read(&id).unwrap(), None);
        assert!(!store.exists(&id).unwrap());
    }

    #[test]
    fn tampered_object_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LooseObjectStore::new(dir.path());
        let id = store.write(&Blob::new(b"original".to_vec()).to_stored_object()).unwrap();
        fs::write(store.object_path(&id), b"blob 8\0tampered").unwrap();
        assert!(matches!(store.read(&id), Err(StoreError::HashMismatch { .. })));
    }
}
