//! Contract for the remote document collection.

use crate::error::StoreResult;
use crate::types::ItemId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Schema-less field bag of a stored document.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Store-assigned write counter of a document. Increases on every write.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Revision(pub u64);

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rev({})", self.0)
    }
}

/// A document as returned by the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub key: ItemId,
    pub revision: Revision,
    pub fields: Fields,
}

/// Condition a conditional write is checked against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Precondition {
    /// No document exists at the key.
    Absent,
    /// The document exists with exactly this revision.
    Revision(Revision),
}

/// A single-document write.
#[derive(Clone, Debug, PartialEq)]
pub enum Write {
    /// Create or fully replace.
    Put(Fields),
    /// Create or overwrite only the given fields.
    Merge(Fields),
    /// Remove the document (absent keys are not an error).
    Delete,
}

/// Keyed document collection the engine mirrors.
///
/// Every call may fail independently; no call is atomic with any other.
/// Implementations return documents from `list_all` in a stable order,
/// which the mirror preserves.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Allocate a fresh key for a new document.
    fn allocate_key(&self) -> ItemId {
        ItemId(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Read the whole collection.
    async fn list_all(&self) -> StoreResult<Vec<StoredDocument>>;

    /// Read one document.
    async fn get_by_key(&self, key: &ItemId) -> StoreResult<Option<StoredDocument>>;

    /// Create or fully replace the document at `key`.
    async fn put(&self, key: &ItemId, fields: Fields) -> StoreResult<()>;

    /// Create the document or overwrite only the fields in `patch`.
    async fn merge_update(&self, key: &ItemId, patch: Fields) -> StoreResult<()>;

    /// Remove the document at `key`.
    async fn delete_by_key(&self, key: &ItemId) -> StoreResult<()>;

    /// Apply `write` only if `precondition` holds.
    ///
    /// Returns `false` without writing when the precondition fails.
    async fn write_if(
        &self,
        key: &ItemId,
        precondition: Precondition,
        write: Write,
    ) -> StoreResult<bool>;
}
