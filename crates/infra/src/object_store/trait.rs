use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use tastemark_core::BlobKey;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlobError {
    #[error("object store unavailable: {0}")]
    Unavailable(String),

    #[error("object already exists: {0}")]
    AlreadyExists(BlobKey),
}

/// Listing entry for a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobMeta {
    pub key: BlobKey,
    pub size: usize,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

/// Flat key/value store for binary objects.
pub trait ObjectStore: Send + Sync {
    /// Store a new object. Keys are never overwritten.
    fn put(&self, key: &BlobKey, content_type: &str, bytes: Vec<u8>) -> Result<BlobMeta, BlobError>;

    fn get(&self, key: &BlobKey) -> Result<Option<Vec<u8>>, BlobError>;

    /// Delete an object; deleting a missing object succeeds.
    fn delete(&self, key: &BlobKey) -> Result<(), BlobError>;

    /// Objects whose key starts with `prefix`, ordered by key.
    fn list(&self, prefix: &str) -> Result<Vec<BlobMeta>, BlobError>;
}

impl<O> ObjectStore for Arc<O>
where
    O: ObjectStore + ?Sized,
{
    fn put(&self, key: &BlobKey, content_type: &str, bytes: Vec<u8>) -> Result<BlobMeta, BlobError> {
        (**self).put(key, content_type, bytes)
    }

    fn get(&self, key: &BlobKey) -> Result<Option<Vec<u8>>, BlobError> {
        (**self).get(key)
    }

    fn delete(&self, key: &BlobKey) -> Result<(), BlobError> {
        (**self).delete(key)
    }

    fn list(&self, prefix: &str) -> Result<Vec<BlobMeta>, BlobError> {
        (**self).list(prefix)
    }
}
