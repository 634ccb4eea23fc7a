//! Approval state shared by every moderated document.

use serde::{Deserialize, Serialize};

use crate::entity::Document;
use crate::id::BlobKey;

/// Moderation state of a submitted entity.
///
/// Stored as the `approved` boolean on the document. `Pending -> Approved` is
/// the only transition; rejection deletes the document instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Approval {
    Pending,
    Approved,
}

impl Approval {
    pub fn is_approved(self) -> bool {
        self == Approval::Approved
    }
}

impl From<bool> for Approval {
    fn from(approved: bool) -> Self {
        if approved {
            Approval::Approved
        } else {
            Approval::Pending
        }
    }
}

impl From<Approval> for bool {
    fn from(value: Approval) -> Self {
        value.is_approved()
    }
}

/// Who a listing is for; decides the `approved` predicate of the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Ordinary users: approved content only.
    Public,
    /// The admin moderation queue: pending content only.
    Moderators,
}

impl Audience {
    /// Value the `approved` field must equal for this audience.
    pub fn approved_flag(self) -> bool {
        matches!(self, Audience::Public)
    }
}

/// A document gated by the moderation workflow.
pub trait Moderated: Document {
    /// Human-readable kind used in logs (e.g. `"product"`).
    const KIND: &'static str;

    /// Name of the boolean field holding the approval flag.
    const APPROVAL_FIELD: &'static str = "approved";

    fn approval(&self) -> Approval;

    fn set_approval(&mut self, approval: Approval);

    /// Binary objects this document references.
    fn blob_keys(&self) -> Vec<BlobKey>;

    /// Move to `Approved`. Returns `false` when the document already was.
    fn mark_approved(&mut self) -> bool {
        if self.approval().is_approved() {
            return false;
        }
        self.set_approval(Approval::Approved);
        true
    }

    fn is_visible_to(&self, audience: Audience) -> bool {
        self.approval().is_approved() == audience.approved_flag()
    }
}
