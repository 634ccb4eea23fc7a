//! Infrastructure layer: store boundaries, in-memory adapters, background jobs
//! and configuration.

pub mod admin_directory;
pub mod blob_sweep;
pub mod config;
pub mod document_store;
pub mod object_store;

pub use admin_directory::{AdminDirectory, AdminGrant};
pub use blob_sweep::{BlobSweeper, SweepError, SweepReport};
pub use config::TastemarkConfig;
pub use document_store::{
    DocumentStore, DocumentStoreExt, Filter, InMemoryDocumentStore, StoreError, WriteBatch,
    WriteOp,
};
pub use object_store::{BlobError, BlobMeta, InMemoryObjectStore, ObjectStore};
