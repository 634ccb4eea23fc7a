//! Change notifications published after a store commit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Upserted,
    Deleted,
}

/// One document write, as seen by live listeners.
///
/// Carries no body: listeners re-read the document (or re-run their query)
/// when they care about the contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: String,
    pub document_id: String,
    pub kind: ChangeKind,
    pub committed_at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn upserted(collection: impl Into<String>, document_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            collection: collection.into(),
            document_id: document_id.into(),
            kind: ChangeKind::Upserted,
            committed_at: at,
        }
    }

    pub fn deleted(collection: impl Into<String>, document_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            collection: collection.into(),
            document_id: document_id.into(),
            kind: ChangeKind::Deleted,
            committed_at: at,
        }
    }

    pub fn touches(&self, collection: &str) -> bool {
        self.collection == collection
    }
}
