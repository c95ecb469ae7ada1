//! Local mirror of the remote collection.
//!
//! The mirror holds one immutable [`Snapshot`] at a time. `refresh` reads the
//! whole collection and swaps the snapshot in one step; it is never patched
//! in place, so each refresh costs a full read of the collection.

use crate::aggregate::{self, CategoryTotal, ItemQuantity};
use crate::error::{EngineError, EngineResult};
use crate::remote::{document, RemoteStore, StoredDocument};
use crate::subscriptions::{
    EngineEvent, SubscriptionConfig, SubscriptionHandle, SubscriptionManager,
};
use crate::types::{ItemId, ItemRecord, SnapshotVersion, Timestamp};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// The collection as of one successful refresh.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    version: SnapshotVersion,
    refreshed_at: Option<Timestamp>,
    items: Vec<ItemRecord>,
    rejected: Vec<ItemId>,
}

impl Snapshot {
    /// The snapshot before the first refresh.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from documents in store order.
    ///
    /// Documents that fail validation, and repeated keys after the first,
    /// are left out and listed in [`rejected`](Self::rejected).
    pub fn from_documents(
        version: SnapshotVersion,
        documents: Vec<StoredDocument>,
        default_category: &str,
    ) -> Self {
        let mut items = Vec::with_capacity(documents.len());
        let mut rejected = Vec::new();
        let mut seen = HashSet::with_capacity(documents.len());

        for doc in documents {
            if !seen.insert(doc.key.clone()) {
                warn!(key = %doc.key, "duplicate key in listing");
                rejected.push(doc.key);
                continue;
            }
            match document::decode(&doc, default_category) {
                Ok(record) => items.push(record),
                Err(e) => {
                    warn!(key = %doc.key, error = %e, "rejected document");
                    rejected.push(doc.key);
                }
            }
        }

        Self {
            version,
            refreshed_at: Some(Timestamp::now()),
            items,
            rejected,
        }
    }

    pub fn version(&self) -> SnapshotVersion {
        self.version
    }

    /// When the listing behind this snapshot completed (`None` before the first refresh).
    pub fn refreshed_at(&self) -> Option<Timestamp> {
        self.refreshed_at
    }

    /// Items in store order.
    pub fn items(&self) -> &[ItemRecord] {
        &self.items
    }

    /// Keys of documents that could not be read as items.
    pub fn rejected(&self) -> &[ItemId] {
        &self.rejected
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemRecord> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &ItemId) -> Option<&ItemRecord> {
        self.items.iter().find(|item| &item.id == id)
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.get(id).is_some()
    }

    pub fn by_category(&self) -> Vec<CategoryTotal> {
        aggregate::by_category(&self.items)
    }

    pub fn by_item(&self) -> Vec<ItemQuantity> {
        aggregate::by_item(&self.items)
    }

    pub fn total_quantity(&self) -> u64 {
        aggregate::total_quantity(&self.items)
    }
}

/// In-memory copy of the remote collection.
pub struct LocalMirror {
    store: Arc<dyn RemoteStore>,
    default_category: String,
    current: RwLock<Arc<Snapshot>>,
    /// Ticket handed to the next refresh; becomes its snapshot version.
    next_ticket: AtomicU64,
    events: Arc<SubscriptionManager>,
}

impl LocalMirror {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        default_category: impl Into<String>,
        events: Arc<SubscriptionManager>,
    ) -> Self {
        Self {
            store,
            default_category: default_category.into(),
            current: RwLock::new(Arc::new(Snapshot::empty())),
            next_ticket: AtomicU64::new(1),
            events,
        }
    }

    /// The latest published snapshot.
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    /// Subscribe to mirror events.
    ///
    /// With `replay_current` the current snapshot is delivered first. The
    /// read lock is held until it is queued, so no newer snapshot can be
    /// broadcast ahead of it.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        let current = self.current.read();
        let replay = config.replay_current;
        let handle = self.events.subscribe(config);
        if replay {
            self.events.send_to(
                handle.id,
                EngineEvent::SnapshotChanged {
                    snapshot: Arc::clone(&current),
                },
            );
        }
        handle
    }

    /// Re-read the whole collection and publish it.
    ///
    /// On failure the current snapshot stays in place and a `SyncFailure`
    /// error event is broadcast. A refresh that completes after a newer one
    /// has already published is discarded and returns the newer snapshot.
    pub async fn refresh(&self) -> EngineResult<Arc<Snapshot>> {
        let ticket = SnapshotVersion(self.next_ticket.fetch_add(1, Ordering::SeqCst));

        let documents = match self.store.list_all().await {
            Ok(documents) => documents,
            Err(e) => {
                let err = EngineError::SyncFailure(e);
                warn!(error = %err, "refresh failed, keeping previous snapshot");
                self.events.broadcast_error(&err);
                return Err(err);
            }
        };

        let snapshot = Arc::new(Snapshot::from_documents(
            ticket,
            documents,
            &self.default_category,
        ));

        let mut current = self.current.write();
        if current.version >= ticket {
            debug!(
                ticket = ticket.0,
                published = current.version.0,
                "discarding stale refresh"
            );
            return Ok(Arc::clone(&current));
        }

        debug!(
            version = ticket.0,
            items = snapshot.len(),
            rejected = snapshot.rejected.len(),
            "published snapshot"
        );
        *current = Arc::clone(&snapshot);
        // Broadcast under the lock so subscribers see versions in order.
        self.events.broadcast_snapshot(&snapshot);
        Ok(snapshot)
    }
}
