//! Shared handles every service is built from.

use std::sync::Arc;

use chrono::Utc;

use tastemark_catalog::UploadLimits;
use tastemark_infra::{
    AdminDirectory, BlobSweeper, InMemoryDocumentStore, InMemoryObjectStore, StoreError, TastemarkConfig,
};

/// Stores, admin source and limits, wired once and cloned into each service.
///
/// `S`, `O` and `A` are normally `Arc`s, so cloning is cheap.
#[derive(Debug, Clone)]
pub struct Backend<S, O, A> {
    pub store: S,
    pub objects: O,
    pub admins: A,
    pub limits: UploadLimits,
}

pub type InMemoryBackend =
    Backend<Arc<InMemoryDocumentStore>, Arc<InMemoryObjectStore>, Arc<AdminDirectory<Arc<InMemoryDocumentStore>>>>;

impl<S, O, A> Backend<S, O, A> {
    pub fn new(store: S, objects: O, admins: A, limits: UploadLimits) -> Self {
        Self {
            store,
            objects,
            admins,
            limits,
        }
    }
}

impl InMemoryBackend {
    /// Fully in-memory wiring for tests and local runs.
    ///
    /// Admin rights are read from the `admins` collection of the same store,
    /// seeded with the configured bootstrap emails.
    pub fn in_memory(config: &TastemarkConfig) -> Result<Self, StoreError> {
        let store = InMemoryDocumentStore::arc();
        let objects = InMemoryObjectStore::arc();
        let admins = Arc::new(AdminDirectory::new(Arc::clone(&store)));
        admins.bootstrap(&config.bootstrap_admins, Utc::now())?;
        Ok(Self::new(store, objects, admins, config.upload_limits()))
    }

    pub fn sweeper(&self, config: &TastemarkConfig) -> BlobSweeper<Arc<InMemoryDocumentStore>, Arc<InMemoryObjectStore>> {
        BlobSweeper::new(Arc::clone(&self.store), Arc::clone(&self.objects), config.blob_gc_grace())
    }
}
