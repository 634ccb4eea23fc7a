use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tastemark_core::{
    Approval, BlobKey, Document, DomainError, DomainResult, Entity, ImageRef, Moderated,
    ProductId, RecipeId, UserId,
};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecipeDraft {
    pub title: String,
    pub steps: Vec<String>,
    pub product_ids: Vec<ProductId>,
}

/// A user recipe built from catalog products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub title: String,
    pub steps: Vec<String>,
    pub product_ids: Vec<ProductId>,
    pub images: Vec<ImageRef>,
    pub approved: bool,
    pub author: UserId,
    pub created_at: DateTime<Utc>,
}

impl Recipe {
    /// Validate a draft into a pending recipe.
    ///
    /// Blank steps are dropped and duplicate product references collapsed
    /// (first occurrence wins). Whether the referenced products exist is
    /// checked by the caller against the store.
    pub fn submit(
        id: RecipeId,
        draft: &RecipeDraft,
        images: Vec<ImageRef>,
        author: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }

        let steps: Vec<String> = draft
            .steps
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if steps.is_empty() {
            return Err(DomainError::validation("a recipe needs at least one step"));
        }

        let mut product_ids = Vec::with_capacity(draft.product_ids.len());
        for id in &draft.product_ids {
            if !product_ids.contains(id) {
                product_ids.push(*id);
            }
        }

        Ok(Self {
            id,
            title: title.to_string(),
            steps,
            product_ids,
            images,
            approved: false,
            author,
            created_at: now,
        })
    }

    pub fn uses_product(&self, product_id: ProductId) -> bool {
        self.product_ids.contains(&product_id)
    }
}

impl Entity for Recipe {
    type Id = RecipeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Document for Recipe {
    const COLLECTION: &'static str = "recipes";
}

impl Moderated for Recipe {
    const KIND: &'static str = "recipe";

    fn approval(&self) -> Approval {
        self.approved.into()
    }

    fn set_approval(&mut self, approval: Approval) {
        self.approved = approval.is_approved();
    }

    fn blob_keys(&self) -> Vec<BlobKey> {
        self.images.iter().map(|i| i.key.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_normalizes_steps_and_product_references() {
        let (a, b) = (ProductId::new(), ProductId::new());
        let draft = RecipeDraft {
            title: " Overnight oats ".to_string(),
            steps: vec!["soak oats".into(), "   ".into(), " add berries".into()],
            product_ids: vec![a, b, a],
        };

        let recipe = Recipe::submit(RecipeId::new(), &draft, vec![], UserId::new(), Utc::now()).unwrap();
        assert_eq!(recipe.title, "Overnight oats");
        assert_eq!(recipe.steps, vec!["soak oats", "add berries"]);
        assert_eq!(recipe.product_ids, vec![a, b]);
        assert!(recipe.uses_product(b));
        assert_eq!(recipe.approval(), Approval::Pending);
    }

    #[test]
    fn submit_requires_title_and_a_step() {
        let no_title = RecipeDraft {
            title: " ".into(),
            steps: vec!["mix".into()],
            product_ids: vec![],
        };
        let no_steps = RecipeDraft {
            title: "Soup".into(),
            steps: vec!["".into()],
            product_ids: vec![],
        };
        for draft in [no_title, no_steps] {
            let err = Recipe::submit(RecipeId::new(), &draft, vec![], UserId::new(), Utc::now()).unwrap_err();
            assert!(err.is_validation());
        }
    }
}
