//! Error types for the inventory engine and its store adapters.

use crate::remote::DocumentError;
use crate::types::ItemId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors returned by remote store adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid store format: {0}")]
    InvalidFormat(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("Store is locked by another process")]
    Locked,
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for StoreError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for StoreError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        StoreError::Deserialization(e.to_string())
    }
}

/// Errors surfaced by the mirror and the mutation applier.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown item: {0}")]
    UnknownItem(ItemId),

    #[error("Malformed document {id}: {source}")]
    MalformedDocument {
        id: ItemId,
        #[source]
        source: DocumentError,
    },

    #[error("Store unavailable during {op}: {source}")]
    StoreUnavailable {
        op: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Sync failure: {0}")]
    SyncFailure(#[source] StoreError),

    #[error("Write conflict on {id} after {attempts} attempts")]
    Conflict { id: ItemId, attempts: u32 },
}

impl EngineError {
    pub(crate) fn store(op: &'static str, source: StoreError) -> Self {
        EngineError::StoreUnavailable { op, source }
    }

    /// Classification carried by error events.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation(_)
            | EngineError::UnknownItem(_)
            | EngineError::MalformedDocument { .. } => ErrorKind::Validation,
            EngineError::StoreUnavailable { .. } => ErrorKind::StoreUnavailable,
            EngineError::SyncFailure(_) => ErrorKind::SyncFailure,
            EngineError::Conflict { .. } => ErrorKind::Conflict,
        }
    }
}

/// Coarse error category reported to subscribers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input or a stored document failed validation.
    Validation,
    /// A single store call failed.
    StoreUnavailable,
    /// A mirror refresh failed.
    SyncFailure,
    /// A conditional write kept losing to concurrent writers.
    Conflict,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::StoreUnavailable => "store_unavailable",
            ErrorKind::SyncFailure => "sync_failure",
            ErrorKind::Conflict => "conflict",
        };
        f.write_str(name)
    }
}

/// Result type for store adapter calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Alias for engine results.
pub type Result<T> = EngineResult<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = EngineError::store("list_all", StoreError::Transport("offline".into()));
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
        assert!(err.to_string().contains("list_all"));

        let err = EngineError::UnknownItem(ItemId::from("x"));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
