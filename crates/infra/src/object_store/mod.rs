//! Object storage boundary for uploaded images.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryObjectStore;
pub use r#trait::{BlobError, BlobMeta, ObjectStore};
