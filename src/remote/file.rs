//! Single-file store adapter.
//!
//! The whole collection lives in `<path>/<collection>.inv`:
//!
//! ```text
//! magic "INV\0" | version u8 | body length u64 LE | MessagePack body | CRC32 of body u32 LE
//! ```
//!
//! Every write is persisted before it is acknowledged. A `<collection>.lock`
//! file held with an exclusive lock keeps other processes out.

use super::adapter::{Fields, Precondition, RemoteStore, StoredDocument, Write};
use super::collection::Collection;
use crate::error::{StoreError, StoreResult};
use crate::types::ItemId;
use async_trait::async_trait;
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Magic bytes for collection files.
const COLLECTION_MAGIC: &[u8; 4] = b"INV\0";

/// Current collection file format version.
const COLLECTION_VERSION: u8 = 1;

/// File store configuration.
#[derive(Clone, Debug)]
pub struct FileStoreConfig {
    /// Directory holding the collection file.
    pub path: PathBuf,

    /// Collection name, used as the file stem.
    pub collection: String,

    /// Whether to create the collection if it doesn't exist.
    pub create_if_missing: bool,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./pantry"),
            collection: "inventory".to_string(),
            create_if_missing: true,
        }
    }
}

/// Collection persisted to a local file.
///
/// Writes run on the blocking thread pool, so calls must be made from
/// within a tokio runtime.
pub struct FileStore {
    config: FileStoreConfig,

    /// Lock file for exclusive access.
    _lock_file: File,

    collection: Arc<Mutex<Collection>>,
}

impl FileStore {
    /// Open an existing collection or create a new one.
    pub fn open_or_create(config: FileStoreConfig) -> StoreResult<Self> {
        if Self::data_path(&config).exists() {
            Self::open(config)
        } else if config.create_if_missing {
            Self::create(config)
        } else {
            Err(StoreError::InvalidFormat(format!(
                "Collection not found: {}",
                Self::data_path(&config).display()
            )))
        }
    }

    /// Create a new, empty collection.
    ///
    /// Fails if the collection file already exists.
    pub fn create(config: FileStoreConfig) -> StoreResult<Self> {
        if Self::data_path(&config).exists() {
            return Err(StoreError::InvalidFormat(format!(
                "Collection already exists: {}",
                Self::data_path(&config).display()
            )));
        }

        fs::create_dir_all(&config.path)?;
        let lock_file = Self::acquire_lock(&config)?;

        let collection = Collection::new();
        Self::save(&Self::data_path(&config), &collection)?;
        info!(collection = %config.collection, path = %config.path.display(), "created collection");

        Ok(Self {
            config,
            _lock_file: lock_file,
            collection: Arc::new(Mutex::new(collection)),
        })
    }

    /// Open an existing collection.
    pub fn open(config: FileStoreConfig) -> StoreResult<Self> {
        let lock_file = Self::acquire_lock(&config)?;
        let collection = Self::load(&Self::data_path(&config))?;
        info!(
            collection = %config.collection,
            documents = collection.len(),
            "opened collection"
        );

        Ok(Self {
            config,
            _lock_file: lock_file,
            collection: Arc::new(Mutex::new(collection)),
        })
    }

    /// Path of the collection file.
    pub fn path(&self) -> PathBuf {
        Self::data_path(&self.config)
    }

    /// Apply a write to a copy of the collection and persist it before committing.
    async fn commit(
        &self,
        key: &ItemId,
        precondition: Option<Precondition>,
        write: Write,
    ) -> StoreResult<bool> {
        let collection = Arc::clone(&self.collection);
        let path = self.path();
        let key = key.clone();

        tokio::task::spawn_blocking(move || -> StoreResult<bool> {
            let mut collection = collection.lock();
            if let Some(precondition) = precondition {
                if !collection.satisfies(&key, precondition) {
                    return Ok(false);
                }
            }

            let mut next = collection.clone();
            next.apply(&key, write);
            Self::save(&path, &next)?;
            *collection = next;
            Ok(true)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Write task failed: {}", e)))?
    }

    fn data_path(config: &FileStoreConfig) -> PathBuf {
        config.path.join(format!("{}.inv", config.collection))
    }

    fn acquire_lock(config: &FileStoreConfig) -> StoreResult<File> {
        let lock_path = config.path.join(format!("{}.lock", config.collection));
        let lock_file = File::create(lock_path)?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| StoreError::Locked)?;

        Ok(lock_file)
    }

    /// Write the collection to a temporary file and rename it into place.
    fn save(path: &Path, collection: &Collection) -> StoreResult<()> {
        let body = rmp_serde::to_vec(collection)?;
        let tmp_path = path.with_extension("inv.tmp");

        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp_path)?;

            file.write_all(COLLECTION_MAGIC)?;
            file.write_all(&[COLLECTION_VERSION])?;
            file.write_all(&(body.len() as u64).to_le_bytes())?;
            file.write_all(&body)?;
            file.write_all(&crc32fast::hash(&body).to_le_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    fn load(path: &Path) -> StoreResult<Collection> {
        let mut file = File::open(path)?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != COLLECTION_MAGIC {
            return Err(StoreError::InvalidFormat("Invalid collection magic".into()));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != COLLECTION_VERSION {
            return Err(StoreError::InvalidFormat(format!(
                "Unsupported collection version: {}",
                version[0]
            )));
        }

        let mut len = [0u8; 8];
        file.read_exact(&mut len)?;
        let len = u64::from_le_bytes(len) as usize;

        let mut body = vec![0u8; len];
        file.read_exact(&mut body)?;

        let mut checksum = [0u8; 4];
        file.read_exact(&mut checksum)?;
        let expected = u32::from_le_bytes(checksum);
        let got = crc32fast::hash(&body);
        if expected != got {
            return Err(StoreError::ChecksumMismatch { expected, got });
        }

        Ok(rmp_serde::from_slice(&body)?)
    }
}

#[async_trait]
impl RemoteStore for FileStore {
    async fn list_all(&self) -> StoreResult<Vec<StoredDocument>> {
        Ok(self.collection.lock().list())
    }

    async fn get_by_key(&self, key: &ItemId) -> StoreResult<Option<StoredDocument>> {
        Ok(self.collection.lock().get(key))
    }

    async fn put(&self, key: &ItemId, fields: Fields) -> StoreResult<()> {
        self.commit(key, None, Write::Put(fields)).await.map(|_| ())
    }

    async fn merge_update(&self, key: &ItemId, patch: Fields) -> StoreResult<()> {
        self.commit(key, None, Write::Merge(patch)).await.map(|_| ())
    }

    async fn delete_by_key(&self, key: &ItemId) -> StoreResult<()> {
        self.commit(key, None, Write::Delete).await.map(|_| ())
    }

    async fn write_if(
        &self,
        key: &ItemId,
        precondition: Precondition,
        write: Write,
    ) -> StoreResult<bool> {
        self.commit(key, Some(precondition), write).await
    }
}
