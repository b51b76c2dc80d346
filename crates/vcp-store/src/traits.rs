use vcp_types::ObjectId;

use crate::error::StoreResult;
use crate::object::StoredObject;

/// Content-addressed storage for encoded objects.
///
/// An object's id is the digest of its encoded record, so a write of
/// existing content changes nothing and returns the id it already had.
/// Concurrent writers of the same content must both succeed.
pub trait ObjectStore: Send + Sync {
    /// `Ok(None)` if `id` is not stored; an error if it is stored but
    /// unreadable or does not hash to `id`.
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>>;

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId>;

    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;
}
