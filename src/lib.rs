//! # Pantry
//!
//! A local mirror and aggregation engine for inventory items kept in a
//! remote document collection.
//!
//! ## Core Concepts
//!
//! - **Remote store**: keyed document collection behind [`RemoteStore`]
//! - **Mirror**: immutable [`Snapshot`] of the collection, replaced on every refresh
//! - **Mutations**: add, edit, delete, increment, decrement; each ends in a refresh
//! - **Aggregates**: category totals and item quantities derived from a snapshot
//!
//! ## Example
//!
//! ```ignore
//! use pantry::{EngineConfig, InMemoryStore, Inventory, ItemDraft};
//! use std::sync::Arc;
//!
//! let inventory = Inventory::new(Arc::new(InMemoryStore::new()), EngineConfig::default());
//! inventory.load().await?;
//!
//! inventory.create_or_replace(&ItemDraft::new("Apples", "Produce", 5)).await?;
//! inventory.create_or_replace(&ItemDraft::new("Widget", "", 1)).await?;
//!
//! for total in inventory.by_category() {
//!     println!("{}: {}", total.category, total.total);
//! }
//! ```

pub mod aggregate;
pub mod engine;
pub mod error;
pub mod mirror;
pub mod mutations;
pub mod remote;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use aggregate::{CategoryTotal, ChartSeries, ItemQuantity, PALETTE};
pub use engine::{EngineConfig, Inventory};
pub use error::{EngineError, EngineResult, ErrorKind, Result, StoreError, StoreResult};
pub use mirror::{LocalMirror, Snapshot};
pub use mutations::{KeyStrategy, MutationApplier, MutationEffect, MutationPolicy, UpdateStrategy};
pub use remote::{
    DocumentError, Fields, FileStore, FileStoreConfig, InMemoryStore, Precondition, RemoteStore,
    Revision, StoreOp, StoredDocument, Write,
};
pub use subscriptions::{
    DropReason, EngineEvent, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId, SubscriptionManager,
};
pub use types::*;
