//! In-process store adapter.

use super::adapter::{Fields, Precondition, RemoteStore, StoredDocument, Write};
use super::collection::Collection;
use crate::error::{StoreError, StoreResult};
use crate::types::ItemId;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Store calls, used to target injected faults and read call counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
    ListAll,
    GetByKey,
    Put,
    MergeUpdate,
    DeleteByKey,
    WriteIf,
}

/// A queued failure for one kind of call.
#[derive(Clone, Debug)]
struct Fault {
    /// Failures left; `None` fails until healed.
    remaining: Option<u32>,
    message: String,
}

/// Collection held in memory.
///
/// Besides backing local use, it can fail chosen calls and can yield to the
/// scheduler before every call so concurrent operations interleave.
pub struct InMemoryStore {
    collection: Mutex<Collection>,
    faults: Mutex<HashMap<StoreOp, Fault>>,
    calls: Mutex<HashMap<StoreOp, usize>>,
    yielding: AtomicBool,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            collection: Mutex::new(Collection::new()),
            faults: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            yielding: AtomicBool::new(false),
        }
    }

    /// Create a store that yields before each call.
    pub fn yielding() -> Self {
        let store = Self::new();
        store.set_yielding(true);
        store
    }

    pub fn set_yielding(&self, yielding: bool) {
        self.yielding.store(yielding, Ordering::SeqCst);
    }

    /// Seed a document directly, bypassing faults and call counts.
    pub fn insert(&self, key: impl Into<ItemId>, fields: Fields) {
        self.collection.lock().apply(&key.into(), Write::Put(fields));
    }

    /// Fail the next `times` calls of `op`.
    pub fn fail_next(&self, op: StoreOp, times: u32, message: impl Into<String>) {
        if times == 0 {
            return;
        }
        self.faults.lock().insert(
            op,
            Fault {
                remaining: Some(times),
                message: message.into(),
            },
        );
    }

    /// Fail every call of `op` until [`heal`](Self::heal).
    pub fn fail_always(&self, op: StoreOp, message: impl Into<String>) {
        self.faults.lock().insert(
            op,
            Fault {
                remaining: None,
                message: message.into(),
            },
        );
    }

    /// Clear every injected fault.
    pub fn heal(&self) {
        self.faults.lock().clear();
    }

    /// Number of calls of `op` made so far, failed ones included.
    pub fn calls(&self, op: StoreOp) -> usize {
        self.calls.lock().get(&op).copied().unwrap_or(0)
    }

    /// Total calls across all operations.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.collection.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn enter(&self, op: StoreOp) -> StoreResult<()> {
        if self.yielding.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }

        *self.calls.lock().entry(op).or_insert(0) += 1;

        let mut faults = self.faults.lock();
        let (message, exhausted) = {
            let Some(fault) = faults.get_mut(&op) else {
                return Ok(());
            };
            if let Some(n) = fault.remaining.as_mut() {
                *n = n.saturating_sub(1);
            }
            (fault.message.clone(), fault.remaining == Some(0))
        };
        if exhausted {
            faults.remove(&op);
        }
        Err(StoreError::Transport(message))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    async fn list_all(&self) -> StoreResult<Vec<StoredDocument>> {
        self.enter(StoreOp::ListAll).await?;
        Ok(self.collection.lock().list())
    }

    async fn get_by_key(&self, key: &ItemId) -> StoreResult<Option<StoredDocument>> {
        self.enter(StoreOp::GetByKey).await?;
        Ok(self.collection.lock().get(key))
    }

    async fn put(&self, key: &ItemId, fields: Fields) -> StoreResult<()> {
        self.enter(StoreOp::Put).await?;
        self.collection.lock().apply(key, Write::Put(fields));
        Ok(())
    }

    async fn merge_update(&self, key: &ItemId, patch: Fields) -> StoreResult<()> {
        self.enter(StoreOp::MergeUpdate).await?;
        self.collection.lock().apply(key, Write::Merge(patch));
        Ok(())
    }

    async fn delete_by_key(&self, key: &ItemId) -> StoreResult<()> {
        self.enter(StoreOp::DeleteByKey).await?;
        self.collection.lock().apply(key, Write::Delete);
        Ok(())
    }

    async fn write_if(
        &self,
        key: &ItemId,
        precondition: Precondition,
        write: Write,
    ) -> StoreResult<bool> {
        self.enter(StoreOp::WriteIf).await?;
        let mut collection = self.collection.lock();
        if !collection.satisfies(key, precondition) {
            return Ok(false);
        }
        collection.apply(key, write);
        Ok(true)
    }
}
