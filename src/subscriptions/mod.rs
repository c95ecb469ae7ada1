//! Subscription system for mirror notifications.
//!
//! Subscribers receive:
//! - `SnapshotChanged` after every successful refresh
//! - `Error` whenever a refresh or a mutation fails at the store
//!
//! Each subscriber owns a bounded buffer; one that stops draining it is
//! dropped rather than slowing the engine down.
//!
//! # Example
//!
//! ```ignore
//! let handle = inventory.subscribe(SubscriptionConfig {
//!     filter: SubscriptionFilter::all(),
//!     replay_current: true,
//!     ..Default::default()
//! });
//!
//! loop {
//!     match handle.recv() {
//!         Ok(EngineEvent::SnapshotChanged { snapshot }) => render(&snapshot),
//!         Ok(EngineEvent::Error { kind, message }) => toast(kind, &message),
//!         Ok(EngineEvent::Dropped { .. }) | Err(_) => break,
//!     }
//! }
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{
    DropReason, EngineEvent, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId,
};
