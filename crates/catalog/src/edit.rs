//! Edit proposals: shadow copies of a product's editable fields.
//!
//! A proposal is approved only by being applied. It deliberately does not
//! implement `Moderated`, so the generic approve path can never flip its flag
//! without copying the fields across.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tastemark_core::{
    BlobKey, Document, DomainError, DomainResult, Entity, ProductEditId, ProductId, UserId,
};

use crate::product::{Product, ProductDetails};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductEdit {
    pub id: ProductEditId,
    pub product_id: ProductId,
    #[serde(flatten)]
    pub details: ProductDetails,
    pub approved: bool,
    pub submitted_by: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    AlreadyApplied,
}

impl ProductEdit {
    /// Stored name of the `approved` flag.
    pub const APPROVED_FIELD: &'static str = "approved";

    pub fn propose(
        id: ProductEditId,
        target: &Product,
        details: ProductDetails,
        submitted_by: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if !target.approved {
            return Err(DomainError::conflict("cannot propose edits to a product awaiting approval"));
        }
        Ok(Self {
            id,
            product_id: target.id,
            details,
            approved: false,
            submitted_by,
            created_at: now,
        })
    }

    pub fn is_pending(&self) -> bool {
        !self.approved
    }

    /// Copy the proposed fields onto `product` and mark the proposal approved.
    ///
    /// Both values are mutated together; callers must persist them in one
    /// atomic write so an approved proposal is always reflected on its product.
    pub fn apply_to(&mut self, product: &mut Product, now: DateTime<Utc>) -> DomainResult<EditOutcome> {
        if self.approved {
            return Ok(EditOutcome::AlreadyApplied);
        }
        if product.id != self.product_id {
            return Err(DomainError::invariant("edit does not target this product"));
        }

        product.details = self.details.clone();
        product.updated_at = Some(now);
        self.approved = true;
        Ok(EditOutcome::Applied)
    }

    /// Images uploaded for this proposal that `product` does not use.
    pub fn unshared_blob_keys(&self, product: Option<&Product>) -> Vec<BlobKey> {
        let in_use: HashSet<&BlobKey> = product
            .map(|p| p.details.images.iter().map(|i| &i.key).collect())
            .unwrap_or_default();
        self.details
            .images
            .iter()
            .map(|i| &i.key)
            .filter(|k| !in_use.contains(k))
            .cloned()
            .collect()
    }
}

impl Entity for ProductEdit {
    type Id = ProductEditId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Document for ProductEdit {
    const COLLECTION: &'static str = "product_edits";
}
