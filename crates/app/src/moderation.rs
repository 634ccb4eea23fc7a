//! The moderation gate.
//!
//! Every user submission enters the store as pending and stays invisible to
//! the public until an admin approves it. Rejection deletes the metadata and
//! then makes one attempt at deleting the binaries; anything left over is
//! reported and later collected by the blob sweeper.
//!
//! Edit proposals are not moderated in place: approving one copies its fields
//! onto the product, and both documents are written in a single batch.

use chrono::Utc;
use serde::Serialize;

use tastemark_auth::{AdminCapability, AuthContext, AuthzError, Caller, require_admin, resolve_capability};
use tastemark_catalog::{EditOutcome, Product, ProductEdit};
use tastemark_core::{Approval, Audience, BlobKey, DomainError, Moderated, ProductEditId};
use tastemark_infra::{DocumentStore, DocumentStoreExt, Filter, ObjectStore, WriteBatch};

use crate::backend::Backend;
use crate::error::AppResult;
use crate::uploads::discard_blobs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalOutcome {
    Approved,
    /// Nothing was written.
    AlreadyApproved,
}

/// What a rejection removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RejectionReport {
    pub blobs_deleted: usize,
    pub blobs_orphaned: Vec<BlobKey>,
}

impl RejectionReport {
    pub fn is_clean(&self) -> bool {
        self.blobs_orphaned.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ModerationGate<S, O, A> {
    backend: Backend<S, O, A>,
}

impl<S, O, A> ModerationGate<S, O, A>
where
    S: DocumentStore,
    O: ObjectStore,
    A: AdminCapability,
{
    pub fn new(backend: Backend<S, O, A>) -> Self {
        Self { backend }
    }

    fn authenticated(caller: &Caller) -> Result<&AuthContext, AuthzError> {
        caller.auth().ok_or(AuthzError::Unauthenticated)
    }

    fn fetch_existing<D: Moderated>(&self, id: &D::Id) -> AppResult<D> {
        self.backend
            .store
            .fetch::<D>(id)?
            .ok_or_else(|| DomainError::NotFound.into())
    }

    /// Store a new submission as pending, whatever approval it arrived with.
    pub fn submit<D: Moderated>(&self, caller: &Caller, mut doc: D) -> AppResult<D::Id> {
        let ctx = Self::authenticated(caller)?;
        doc.set_approval(Approval::Pending);

        let mut batch = WriteBatch::new();
        batch.create(&doc)?;
        self.backend.store.commit(batch)?;

        tracing::info!(kind = D::KIND, id = %doc.id(), user_id = %ctx.user_id(), "submission pending review");
        Ok(doc.id().clone())
    }

    pub fn approve<D: Moderated>(&self, caller: &Caller, id: &D::Id) -> AppResult<ApprovalOutcome> {
        let admin = require_admin(&self.backend.admins, caller)?;
        let mut doc = self.fetch_existing::<D>(id)?;

        if !doc.mark_approved() {
            tracing::debug!(kind = D::KIND, %id, "already approved");
            return Ok(ApprovalOutcome::AlreadyApproved);
        }

        let mut batch = WriteBatch::new();
        batch.update_if(&doc, D::APPROVAL_FIELD, false)?;
        self.backend.store.commit(batch)?;

        tracing::info!(kind = D::KIND, %id, admin = %admin.email(), "approved");
        Ok(ApprovalOutcome::Approved)
    }

    /// Delete a pending submission and, best effort, its images.
    ///
    /// Approved content cannot be rejected; it is removed through the
    /// owning service's delete operation instead. The delete only commits if
    /// the stored document is still pending, so an approval that lands
    /// between the read and the write turns the rejection into a conflict.
    pub fn reject<D: Moderated>(&self, caller: &Caller, id: &D::Id) -> AppResult<RejectionReport> {
        let admin = require_admin(&self.backend.admins, caller)?;
        let doc = self.fetch_existing::<D>(id)?;

        if doc.approval().is_approved() {
            return Err(DomainError::conflict(format!("approved {} cannot be rejected", D::KIND)).into());
        }

        let mut batch = WriteBatch::new();
        batch.remove_if::<D>(id, D::APPROVAL_FIELD, false);
        self.backend.store.commit(batch)?;

        let cleanup = discard_blobs(&self.backend.objects, doc.blob_keys(), D::KIND);
        tracing::info!(
            kind = D::KIND,
            %id,
            admin = %admin.email(),
            blobs_deleted = cleanup.deleted,
            blobs_orphaned = cleanup.orphaned.len(),
            "rejected"
        );
        Ok(RejectionReport {
            blobs_deleted: cleanup.deleted,
            blobs_orphaned: cleanup.orphaned,
        })
    }

    /// Documents matching `filter` that `audience` may see.
    ///
    /// The moderation queue (`Audience::Moderators`) is admin only.
    pub fn list_visible<D: Moderated>(&self, caller: &Caller, audience: Audience, filter: Filter) -> AppResult<Vec<D>> {
        if audience == Audience::Moderators {
            require_admin(&self.backend.admins, caller)?;
        }
        let filter = filter.eq(D::APPROVAL_FIELD, audience.approved_flag());
        Ok(self.backend.store.find::<D>(&filter)?)
    }

    /// One document, if the caller may see it: approved content for everyone,
    /// pending content for admins only.
    pub fn get_visible<D: Moderated>(&self, caller: &Caller, id: &D::Id) -> AppResult<Option<D>> {
        let Some(doc) = self.backend.store.fetch::<D>(id)? else {
            return Ok(None);
        };
        if doc.is_visible_to(Audience::Public) || resolve_capability(&self.backend.admins, caller).is_admin() {
            Ok(Some(doc))
        } else {
            Ok(None)
        }
    }

    pub fn pending_edits(&self, caller: &Caller) -> AppResult<Vec<ProductEdit>> {
        require_admin(&self.backend.admins, caller)?;
        Ok(self.backend.store.find::<ProductEdit>(&Filter::all().eq(ProductEdit::APPROVED_FIELD, false))?)
    }

    /// Copy a pending edit onto its product. Product and edit are written in
    /// one batch, so neither can be observed without the other.
    pub fn apply_edit(&self, caller: &Caller, edit_id: &ProductEditId) -> AppResult<EditOutcome> {
        let admin = require_admin(&self.backend.admins, caller)?;
        let mut edit = self
            .backend
            .store
            .fetch::<ProductEdit>(edit_id)?
            .ok_or(DomainError::NotFound)?;

        if !edit.is_pending() {
            tracing::debug!(%edit_id, "edit already applied");
            return Ok(EditOutcome::AlreadyApplied);
        }

        let mut product = self
            .backend
            .store
            .fetch::<Product>(&edit.product_id)?
            .ok_or(DomainError::NotFound)?;

        let outcome = edit.apply_to(&mut product, Utc::now())?;
        let mut batch = WriteBatch::new();
        batch
            .update(&product)?
            .update_if(&edit, ProductEdit::APPROVED_FIELD, false)?;
        self.backend.store.commit(batch)?;

        tracing::info!(%edit_id, product_id = %product.id, admin = %admin.email(), "edit applied");
        Ok(outcome)
    }

    /// Discard a pending edit and the images only it referenced.
    ///
    /// Which images are unshared is decided against the product as read
    /// here; the delete requires the edit to still be pending, so an edit
    /// applied in the meantime is never stripped of its images.
    pub fn reject_edit(&self, caller: &Caller, edit_id: &ProductEditId) -> AppResult<RejectionReport> {
        let admin = require_admin(&self.backend.admins, caller)?;
        let edit = self
            .backend
            .store
            .fetch::<ProductEdit>(edit_id)?
            .ok_or(DomainError::NotFound)?;

        if !edit.is_pending() {
            return Err(DomainError::conflict("applied edits cannot be rejected").into());
        }

        let product = self.backend.store.fetch::<Product>(&edit.product_id)?;
        let keys = edit.unshared_blob_keys(product.as_ref());

        let mut batch = WriteBatch::new();
        batch.remove_if::<ProductEdit>(edit_id, ProductEdit::APPROVED_FIELD, false);
        self.backend.store.commit(batch)?;

        let cleanup = discard_blobs(&self.backend.objects, keys, "product_edit");
        tracing::info!(%edit_id, admin = %admin.email(), blobs_deleted = cleanup.deleted, "edit rejected");
        Ok(RejectionReport {
            blobs_deleted: cleanup.deleted,
            blobs_orphaned: cleanup.orphaned,
        })
    }
}
