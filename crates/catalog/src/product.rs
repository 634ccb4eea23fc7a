use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tastemark_core::{
    Approval, BlobKey, Document, DomainError, DomainResult, Entity, ImageRef, Moderated,
    ProductId, UserId,
};

/// Text fields of the product submission / edit form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    pub category: String,
    pub description: String,
}

/// The editable part of a product; shared verbatim with edit proposals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub name: String,
    pub category: String,
    pub description: String,
    pub images: Vec<ImageRef>,
}

impl ProductDetails {
    /// Trim and validate a draft, attaching already-stored images.
    pub fn from_draft(draft: &ProductDraft, images: Vec<ImageRef>) -> DomainResult<Self> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        let category = draft.category.trim();
        if category.is_empty() {
            return Err(DomainError::validation("category cannot be empty"));
        }

        Ok(Self {
            name: name.to_string(),
            category: category.to_string(),
            description: draft.description.trim().to_string(),
            images,
        })
    }

    pub fn blob_keys(&self) -> Vec<BlobKey> {
        self.images.iter().map(|i| i.key.clone()).collect()
    }
}

/// A catalog product. Hidden from the public until an admin approves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(flatten)]
    pub details: ProductDetails,
    pub approved: bool,
    pub submitted_by: UserId,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Build a freshly submitted (pending) product.
    pub fn submit(
        id: ProductId,
        details: ProductDetails,
        submitted_by: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            details,
            approved: false,
            submitted_by,
            created_at: now,
            updated_at: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.details.name
    }

    pub fn category(&self) -> &str {
        &self.details.category
    }

    pub fn images(&self) -> &[ImageRef] {
        &self.details.images
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Document for Product {
    const COLLECTION: &'static str = "products";
}

impl Moderated for Product {
    const KIND: &'static str = "product";

    fn approval(&self) -> Approval {
        self.approved.into()
    }

    fn set_approval(&mut self, approval: Approval) {
        self.approved = approval.is_approved();
    }

    fn blob_keys(&self) -> Vec<BlobKey> {
        self.details.blob_keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tastemark_core::Audience;

    fn draft(name: &str, category: &str) -> ProductDraft {
        ProductDraft {
            name: name.to_string(),
            category: category.to_string(),
            description: "  crunchy  ".to_string(),
        }
    }

    #[test]
    fn details_are_trimmed() {
        let details = ProductDetails::from_draft(&draft("  Oat Bar ", " snacks"), vec![]).unwrap();
        assert_eq!(details.name, "Oat Bar");
        assert_eq!(details.category, "snacks");
        assert_eq!(details.description, "crunchy");
    }

    #[test]
    fn blank_name_or_category_is_rejected() {
        assert!(ProductDetails::from_draft(&draft("   ", "snacks"), vec![]).unwrap_err().is_validation());
        assert!(ProductDetails::from_draft(&draft("Oat Bar", ""), vec![]).unwrap_err().is_validation());
    }

    #[test]
    fn submitted_products_start_pending_and_approve_once() {
        let details = ProductDetails::from_draft(&draft("Oat Bar", "snacks"), vec![]).unwrap();
        let mut product = Product::submit(ProductId::new(), details, UserId::new(), Utc::now());

        assert_eq!(product.approval(), Approval::Pending);
        assert!(!product.is_visible_to(Audience::Public));
        assert!(product.is_visible_to(Audience::Moderators));

        assert!(product.mark_approved());
        assert!(!product.mark_approved());
        assert!(product.is_visible_to(Audience::Public));
    }

    #[test]
    fn stored_form_keeps_editable_fields_at_top_level() {
        let key = BlobKey::new("products/x/1.jpg");
        let details = ProductDetails::from_draft(
            &draft("Oat Bar", "snacks"),
            vec![ImageRef::new(key.clone(), "image/jpeg")],
        )
        .unwrap();
        let product = Product::submit(ProductId::new(), details, UserId::new(), Utc::now());

        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["approved"], false);
        assert_eq!(json["category"], "snacks");
        assert_eq!(json["images"][0]["key"], "products/x/1.jpg");
        assert_eq!(product.blob_keys(), vec![key]);

        let back: Product = serde_json::from_value(json).unwrap();
        assert_eq!(back, product);
    }
}
