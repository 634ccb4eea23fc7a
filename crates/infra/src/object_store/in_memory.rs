use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use tastemark_core::BlobKey;

use super::r#trait::{BlobError, BlobMeta, ObjectStore};

#[derive(Debug, Clone)]
struct StoredBlob {
    meta: BlobMeta,
    bytes: Vec<u8>,
}

/// In-memory object store for tests/dev, with switchable failures.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    blobs: RwLock<BTreeMap<BlobKey, StoredBlob>>,
    failing_puts: AtomicBool,
    failing_deletes: AtomicBool,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn fail_puts(&self, failing: bool) {
        self.failing_puts.store(failing, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, failing: bool) {
        self.failing_deletes.store(failing, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &BlobKey) -> bool {
        self.blobs.read().map(|b| b.contains_key(key)).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store an object with an explicit creation time (e.g. to age it).
    pub fn put_at(
        &self,
        key: &BlobKey,
        content_type: &str,
        bytes: Vec<u8>,
        created_at: DateTime<Utc>,
    ) -> Result<BlobMeta, BlobError> {
        if self.failing_puts.load(Ordering::SeqCst) {
            return Err(BlobError::Unavailable("injected put failure".to_string()));
        }
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| BlobError::Unavailable("lock poisoned".to_string()))?;
        if blobs.contains_key(key) {
            return Err(BlobError::AlreadyExists(key.clone()));
        }
        let meta = BlobMeta {
            key: key.clone(),
            size: bytes.len(),
            content_type: content_type.to_string(),
            created_at,
        };
        blobs.insert(key.clone(), StoredBlob { meta: meta.clone(), bytes });
        Ok(meta)
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn put(&self, key: &BlobKey, content_type: &str, bytes: Vec<u8>) -> Result<BlobMeta, BlobError> {
        self.put_at(key, content_type, bytes, Utc::now())
    }

    fn get(&self, key: &BlobKey) -> Result<Option<Vec<u8>>, BlobError> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| BlobError::Unavailable("lock poisoned".to_string()))?;
        Ok(blobs.get(key).map(|b| b.bytes.clone()))
    }

    fn delete(&self, key: &BlobKey) -> Result<(), BlobError> {
        if self.failing_deletes.load(Ordering::SeqCst) {
            return Err(BlobError::Unavailable("injected delete failure".to_string()));
        }
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| BlobError::Unavailable("lock poisoned".to_string()))?;
        blobs.remove(key);
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<BlobMeta>, BlobError> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| BlobError::Unavailable("lock poisoned".to_string()))?;
        Ok(blobs
            .values()
            .filter(|b| b.meta.key.has_prefix(prefix))
            .map(|b| b.meta.clone())
            .collect())
    }
}
