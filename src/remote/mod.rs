//! Remote document collection: the adapter contract and bundled adapters.
//!
//! The engine only talks to [`RemoteStore`]. Two adapters ship with the crate:
//! [`InMemoryStore`] for local use and tests, and [`FileStore`], which keeps
//! the collection in a single checksummed file.

mod adapter;
mod collection;
pub mod document;
mod file;
mod memory;

pub use adapter::{Fields, Precondition, RemoteStore, Revision, StoredDocument, Write};
pub use document::DocumentError;
pub use file::{FileStore, FileStoreConfig};
pub use memory::{InMemoryStore, StoreOp};
