//! Subscription types for mirror notifications.

use crate::error::{EngineError, ErrorKind};
use crate::mirror::Snapshot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Configuration for a subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max buffered events before dropping subscriber.
    /// Default: 1000
    pub buffer_size: usize,

    /// Deliver the current snapshot right after subscribing.
    pub replay_current: bool,

    /// Filter criteria.
    pub filter: SubscriptionFilter,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1000,
            replay_current: false,
            filter: SubscriptionFilter::all(),
        }
    }
}

/// Filter criteria for subscriptions.
#[derive(Clone, Debug, Default)]
pub struct SubscriptionFilter {
    /// Include snapshot-changed events.
    pub include_snapshots: bool,

    /// Include error events.
    pub include_errors: bool,

    /// Restrict error events to these kinds (None = all kinds).
    pub error_kinds: Option<Vec<ErrorKind>>,
}

impl SubscriptionFilter {
    /// Only published snapshots.
    pub fn snapshots() -> Self {
        Self {
            include_snapshots: true,
            ..Default::default()
        }
    }

    /// Only errors.
    pub fn errors() -> Self {
        Self {
            include_errors: true,
            ..Default::default()
        }
    }

    /// Only errors of the given kinds.
    pub fn error_kinds(kinds: Vec<ErrorKind>) -> Self {
        Self {
            include_errors: true,
            error_kinds: Some(kinds),
            ..Default::default()
        }
    }

    /// Everything.
    pub fn all() -> Self {
        Self {
            include_snapshots: true,
            include_errors: true,
            error_kinds: None,
        }
    }
}

/// Events emitted to subscribers.
#[derive(Clone, Debug)]
pub enum EngineEvent {
    /// A refresh published a new snapshot.
    SnapshotChanged { snapshot: Arc<Snapshot> },

    /// A mirror or mutation operation failed.
    Error { kind: ErrorKind, message: String },

    /// Subscription was dropped.
    Dropped { reason: DropReason },
}

impl EngineEvent {
    pub(crate) fn from_error(err: &EngineError) -> Self {
        EngineEvent::Error {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle to manage a subscription.
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<EngineEvent>,
}

impl SubscriptionHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<EngineEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<EngineEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<EngineEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Take every event already buffered.
    pub fn drain(&self) -> Vec<EngineEvent> {
        self.receiver.try_iter().collect()
    }
}
