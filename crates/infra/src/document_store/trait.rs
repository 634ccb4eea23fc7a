use std::sync::Arc;

use serde_json::Value as JsonValue;
use thiserror::Error;

use tastemark_core::Document;
use tastemark_events::{ChangeEvent, Subscription};

/// Document store operation error.
///
/// Infrastructure failures only; business rule failures are `DomainError`s.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend could not serve the request (network, lock poisoning, ...).
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    /// A write batch precondition did not hold; nothing was written.
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("invalid write: {0}")]
    InvalidWrite(String),
}

/// Field-equality query predicate.
///
/// Fields are addressed by name; nested fields use dots (`"image.key"`).
/// An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, JsonValue)>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    /// Equality against the `Display` form of an identifier.
    pub fn eq_id(self, field: impl Into<String>, id: impl core::fmt::Display) -> Self {
        self.eq(field, JsonValue::String(id.to_string()))
    }

    pub fn matches(&self, doc: &JsonValue) -> bool {
        self.clauses.iter().all(|(field, expected)| {
            let pointer = format!("/{}", field.replace('.', "/"));
            doc.pointer(&pointer) == Some(expected)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    None,
    /// Fail the batch if the document already exists.
    Absent,
    /// Fail the batch if the document does not exist.
    Exists,
    /// Fail the batch unless the document exists and its boolean `field`
    /// still holds `value`.
    FieldIs { field: &'static str, value: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Put {
        collection: String,
        key: String,
        document: JsonValue,
        precondition: Precondition,
    },
    Delete {
        collection: String,
        key: String,
        precondition: Precondition,
    },
    /// Add `delta` to a numeric field, clamping at zero. The document must exist.
    Increment {
        collection: String,
        key: String,
        field: String,
        delta: i64,
    },
    /// Check a document without writing it.
    Assert {
        collection: String,
        key: String,
        precondition: Precondition,
    },
}

impl WriteOp {
    pub fn collection(&self) -> &str {
        match self {
            WriteOp::Put { collection, .. }
            | WriteOp::Delete { collection, .. }
            | WriteOp::Increment { collection, .. }
            | WriteOp::Assert { collection, .. } => collection,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            WriteOp::Put { key, .. }
            | WriteOp::Delete { key, .. }
            | WriteOp::Increment { key, .. }
            | WriteOp::Assert { key, .. } => key,
        }
    }
}

/// Writes committed all-or-nothing by [`DocumentStore::commit`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    pub fn push(&mut self, op: WriteOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    fn put_with<D: Document>(&mut self, doc: &D, precondition: Precondition) -> Result<&mut Self, StoreError> {
        let document = serde_json::to_value(doc).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(self.push(WriteOp::Put {
            collection: D::COLLECTION.to_string(),
            key: doc.key(),
            document,
            precondition,
        }))
    }

    /// Insert or overwrite a document.
    pub fn put<D: Document>(&mut self, doc: &D) -> Result<&mut Self, StoreError> {
        self.put_with(doc, Precondition::None)
    }

    /// Insert a document that must not exist yet.
    pub fn create<D: Document>(&mut self, doc: &D) -> Result<&mut Self, StoreError> {
        self.put_with(doc, Precondition::Absent)
    }

    /// Overwrite a document that must still exist.
    pub fn update<D: Document>(&mut self, doc: &D) -> Result<&mut Self, StoreError> {
        self.put_with(doc, Precondition::Exists)
    }

    /// Overwrite a document whose stored `field` still equals `value`.
    pub fn update_if<D: Document>(&mut self, doc: &D, field: &'static str, value: bool) -> Result<&mut Self, StoreError> {
        self.put_with(doc, Precondition::FieldIs { field, value })
    }

    /// Delete a document; deleting a missing one is a no-op.
    pub fn delete<D: Document>(&mut self, id: &D::Id) -> &mut Self {
        self.push(WriteOp::Delete {
            collection: D::COLLECTION.to_string(),
            key: D::key_of(id),
            precondition: Precondition::None,
        })
    }

    /// Delete a document that must exist.
    pub fn remove_existing<D: Document>(&mut self, id: &D::Id) -> &mut Self {
        self.push(WriteOp::Delete {
            collection: D::COLLECTION.to_string(),
            key: D::key_of(id),
            precondition: Precondition::Exists,
        })
    }

    /// Delete a document whose stored `field` still equals `value`.
    pub fn remove_if<D: Document>(&mut self, id: &D::Id, field: &'static str, value: bool) -> &mut Self {
        self.push(WriteOp::Delete {
            collection: D::COLLECTION.to_string(),
            key: D::key_of(id),
            precondition: Precondition::FieldIs { field, value },
        })
    }

    /// Fail the batch if the document is gone by commit time.
    pub fn assert_exists<D: Document>(&mut self, id: &D::Id) -> &mut Self {
        self.push(WriteOp::Assert {
            collection: D::COLLECTION.to_string(),
            key: D::key_of(id),
            precondition: Precondition::Exists,
        })
    }

    pub fn increment<D: Document>(&mut self, id: &D::Id, field: impl Into<String>, delta: i64) -> &mut Self {
        self.push(WriteOp::Increment {
            collection: D::COLLECTION.to_string(),
            key: D::key_of(id),
            field: field.into(),
            delta,
        })
    }
}

/// A document database holding JSON documents in named collections.
///
/// Single operations and whole [`WriteBatch`]es are atomic. Every committed
/// write is announced on the change feed returned by `subscribe`.
pub trait DocumentStore: Send + Sync {
    fn get(&self, collection: &str, key: &str) -> Result<Option<JsonValue>, StoreError>;

    /// Documents matching `filter`, ordered by key.
    fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<JsonValue>, StoreError>;

    /// Apply every operation or none of them.
    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    fn subscribe(&self) -> Subscription<ChangeEvent>;

    fn put(&self, collection: &str, key: &str, document: JsonValue) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.push(WriteOp::Put {
            collection: collection.to_string(),
            key: key.to_string(),
            document,
            precondition: Precondition::None,
        });
        self.commit(batch)
    }

    fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.push(WriteOp::Delete {
            collection: collection.to_string(),
            key: key.to_string(),
            precondition: Precondition::None,
        });
        self.commit(batch)
    }
}

impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    fn get(&self, collection: &str, key: &str) -> Result<Option<JsonValue>, StoreError> {
        (**self).get(collection, key)
    }

    fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<JsonValue>, StoreError> {
        (**self).query(collection, filter)
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        (**self).commit(batch)
    }

    fn subscribe(&self) -> Subscription<ChangeEvent> {
        (**self).subscribe()
    }
}

fn decode<D: Document>(value: JsonValue) -> Result<D, StoreError> {
    serde_json::from_value(value)
        .map_err(|e| StoreError::Serialization(format!("{}: {e}", D::COLLECTION)))
}

/// Typed access on top of any [`DocumentStore`].
pub trait DocumentStoreExt: DocumentStore {
    fn fetch<D: Document>(&self, id: &D::Id) -> Result<Option<D>, StoreError> {
        self.get(D::COLLECTION, &D::key_of(id))?.map(decode).transpose()
    }

    fn find<D: Document>(&self, filter: &Filter) -> Result<Vec<D>, StoreError> {
        self.query(D::COLLECTION, filter)?.into_iter().map(decode).collect()
    }

    fn save<D: Document>(&self, doc: &D) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.put(doc)?;
        self.commit(batch)
    }

    fn remove<D: Document>(&self, id: &D::Id) -> Result<(), StoreError> {
        self.delete(D::COLLECTION, &D::key_of(id))
    }
}

impl<S: DocumentStore + ?Sized> DocumentStoreExt for S {}
