//! Document database boundary.
//!
//! Collections of JSON documents addressed by string keys, with equality
//! queries and atomic multi-document write batches. Typed access goes through
//! [`DocumentStoreExt`].

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryDocumentStore;
pub use r#trait::{
    DocumentStore, DocumentStoreExt, Filter, Precondition, StoreError, WriteBatch, WriteOp,
};
