//! Products, edit proposals, recipes and reviews.

use std::collections::{HashMap, HashSet};

use chrono::Utc;

use tastemark_auth::{AdminCapability, AuthContext, AuthzError, Caller, ensure_owner_or_admin, require_admin};
use tastemark_catalog::{
    ImageUpload, Product, ProductDetails, ProductDraft, ProductEdit, RatingSummary, Recipe, RecipeDraft, Review,
    ReviewDraft, ReviewImage, ReviewView, validate_uploads,
};
use tastemark_core::{
    Audience, BlobKey, Document, DomainError, ImageRef, Moderated, ProductEditId, ProductId, RecipeId, ReviewId,
};
use tastemark_infra::{DocumentStore, DocumentStoreExt, Filter, ObjectStore, WriteBatch};

use crate::backend::Backend;
use crate::error::AppResult;
use crate::live::LiveQuery;
use crate::moderation::ModerationGate;
use crate::uploads::{BlobCleanup, discard_blobs, store_uploads};

#[derive(Debug, Clone)]
pub struct CatalogService<S, O, A> {
    backend: Backend<S, O, A>,
    gate: ModerationGate<S, O, A>,
}

impl<S, O, A> CatalogService<S, O, A>
where
    S: DocumentStore + Clone,
    O: ObjectStore + Clone,
    A: AdminCapability + Clone,
{
    pub fn new(backend: Backend<S, O, A>) -> Self {
        Self {
            gate: ModerationGate::new(backend.clone()),
            backend,
        }
    }

    pub fn gate(&self) -> &ModerationGate<S, O, A> {
        &self.gate
    }

    /// Changes to catalog content made after this call.
    pub fn watch(&self) -> LiveQuery {
        LiveQuery::new(
            self.backend.store.subscribe(),
            &[
                Product::COLLECTION,
                ProductEdit::COLLECTION,
                Recipe::COLLECTION,
                Review::COLLECTION,
                ReviewImage::COLLECTION,
            ],
        )
    }

    fn authenticated(caller: &Caller) -> Result<&AuthContext, AuthzError> {
        caller.auth().ok_or(AuthzError::Unauthenticated)
    }

    /// Write a batch that references freshly uploaded images. If the write
    /// fails the uploads are discarded again before the error is returned.
    fn commit_with_uploads(&self, batch: WriteBatch, images: &[ImageRef]) -> AppResult<()> {
        if let Err(err) = self.backend.store.commit(batch) {
            discard_blobs(&self.backend.objects, images.iter().map(|i| i.key.clone()), "unsaved submission");
            return Err(err.into());
        }
        Ok(())
    }

    // -- products ---------------------------------------------------------

    pub fn submit_product(&self, caller: &Caller, draft: &ProductDraft, uploads: Vec<ImageUpload>) -> AppResult<ProductId> {
        let ctx = Self::authenticated(caller)?;
        let mut details = ProductDetails::from_draft(draft, Vec::new())?;
        validate_uploads(&uploads, 0, &self.backend.limits)?;

        let id = ProductId::new();
        details.images = store_uploads(&self.backend.objects, Product::COLLECTION, id, uploads)?;
        let product = Product::submit(id, details, ctx.user_id(), Utc::now());

        let images = product.details.images.clone();
        self.gate.submit(caller, product).inspect_err(|_| {
            discard_blobs(&self.backend.objects, images.iter().map(|i| i.key.clone()), "unsaved product");
        })
    }

    /// Public product listing, or the moderation queue for admins.
    pub fn list_products(&self, caller: &Caller, audience: Audience) -> AppResult<Vec<Product>> {
        let mut products = self.gate.list_visible::<Product>(caller, audience, Filter::all())?;
        products.sort_by(|a, b| a.name().to_lowercase().cmp(&b.name().to_lowercase()));
        Ok(products)
    }

    pub fn list_products_in_category(&self, category: &str) -> AppResult<Vec<Product>> {
        let filter = Filter::all().eq("category", category.trim());
        let mut products = self.gate.list_visible::<Product>(&Caller::Anonymous, Audience::Public, filter)?;
        products.sort_by(|a, b| a.name().to_lowercase().cmp(&b.name().to_lowercase()));
        Ok(products)
    }

    /// Distinct categories of approved products, sorted.
    pub fn categories(&self) -> AppResult<Vec<String>> {
        let mut categories: Vec<String> = self
            .gate
            .list_visible::<Product>(&Caller::Anonymous, Audience::Public, Filter::all())?
            .into_iter()
            .map(|p| p.details.category)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        categories.sort();
        Ok(categories)
    }

    pub fn get_product(&self, caller: &Caller, id: &ProductId) -> AppResult<Option<Product>> {
        self.gate.get_visible::<Product>(caller, id)
    }

    /// Propose new details for an approved product.
    ///
    /// `kept_images` must be a subset of the product's current images; new
    /// uploads are stored under the proposal's own prefix.
    pub fn propose_edit(
        &self,
        caller: &Caller,
        product_id: &ProductId,
        draft: &ProductDraft,
        kept_images: &[BlobKey],
        uploads: Vec<ImageUpload>,
    ) -> AppResult<ProductEditId> {
        let ctx = Self::authenticated(caller)?;
        let product = self
            .backend
            .store
            .fetch::<Product>(product_id)?
            .ok_or(DomainError::NotFound)?;

        let mut images: Vec<ImageRef> = Vec::with_capacity(kept_images.len() + uploads.len());
        for key in kept_images {
            let current = product
                .images()
                .iter()
                .find(|i| &i.key == key)
                .ok_or_else(|| DomainError::validation(format!("{key} is not an image of this product")))?;
            if !images.contains(current) {
                images.push(current.clone());
            }
        }

        let mut details = ProductDetails::from_draft(draft, Vec::new())?;
        validate_uploads(&uploads, images.len(), &self.backend.limits)?;
        let edit_id = ProductEditId::new();
        let mut edit = ProductEdit::propose(edit_id, &product, details.clone(), ctx.user_id(), Utc::now())?;

        let uploaded = store_uploads(&self.backend.objects, ProductEdit::COLLECTION, edit_id, uploads)?;
        images.extend(uploaded.iter().cloned());
        details.images = images;
        edit.details = details;

        let mut batch = WriteBatch::new();
        batch.create(&edit)?;
        self.commit_with_uploads(batch, &uploaded)?;

        tracing::info!(%edit_id, %product_id, user_id = %ctx.user_id(), "edit proposed");
        Ok(edit_id)
    }

    pub fn pending_edits(&self, caller: &Caller) -> AppResult<Vec<ProductEdit>> {
        let mut edits = self.gate.pending_edits(caller)?;
        edits.sort_by_key(|e| e.created_at);
        Ok(edits)
    }

    /// Remove a product with its reviews, review images and edit proposals.
    ///
    /// Documents go in one batch; blobs are deleted afterwards, best effort.
    /// Recipes keep existing but stop referencing the product.
    pub fn delete_product(&self, caller: &Caller, product_id: &ProductId) -> AppResult<BlobCleanup> {
        let admin = require_admin(&self.backend.admins, caller)?;
        let product = self
            .backend
            .store
            .fetch::<Product>(product_id)?
            .ok_or(DomainError::NotFound)?;

        let by_product = Filter::all().eq_id("product_id", product_id);
        let reviews = self.backend.store.find::<Review>(&by_product)?;
        let images = self.backend.store.find::<ReviewImage>(&by_product)?;
        let edits = self.backend.store.find::<ProductEdit>(&by_product)?;
        let recipes: Vec<Recipe> = self
            .backend
            .store
            .find::<Recipe>(&Filter::all())?
            .into_iter()
            .filter(|r| r.uses_product(*product_id))
            .collect();

        let mut batch = WriteBatch::new();
        batch.remove_existing::<Product>(product_id);
        for review in &reviews {
            batch.delete::<Review>(&review.id);
        }
        for image in &images {
            batch.delete::<ReviewImage>(&image.id);
        }
        for edit in &edits {
            batch.delete::<ProductEdit>(&edit.id);
        }
        for mut recipe in recipes {
            recipe.product_ids.retain(|id| id != product_id);
            batch.update(&recipe)?;
        }
        self.backend.store.commit(batch)?;

        let mut keys: Vec<BlobKey> = product.blob_keys();
        keys.extend(images.iter().flat_map(Moderated::blob_keys));
        keys.extend(edits.iter().flat_map(|e| e.details.blob_keys()));
        let mut seen = HashSet::new();
        keys.retain(|k| seen.insert(k.clone()));

        let cleanup = discard_blobs(&self.backend.objects, keys, "deleted product");
        tracing::info!(
            %product_id,
            admin = %admin.email(),
            reviews = reviews.len(),
            edits = edits.len(),
            blobs_orphaned = cleanup.orphaned.len(),
            "product deleted"
        );
        Ok(cleanup)
    }

    // -- recipes ----------------------------------------------------------

    /// Submit a recipe. Every referenced product must exist and be approved.
    pub fn submit_recipe(&self, caller: &Caller, draft: &RecipeDraft, uploads: Vec<ImageUpload>) -> AppResult<RecipeId> {
        let ctx = Self::authenticated(caller)?;
        let id = RecipeId::new();
        let mut recipe = Recipe::submit(id, draft, Vec::new(), ctx.user_id(), Utc::now())?;

        for product_id in &recipe.product_ids {
            let approved = self
                .backend
                .store
                .fetch::<Product>(product_id)?
                .is_some_and(|p| p.is_visible_to(Audience::Public));
            if !approved {
                return Err(DomainError::validation(format!("unknown product {product_id}")).into());
            }
        }
        validate_uploads(&uploads, 0, &self.backend.limits)?;

        recipe.images = store_uploads(&self.backend.objects, Recipe::COLLECTION, id, uploads)?;
        let images = recipe.images.clone();
        self.gate.submit(caller, recipe).inspect_err(|_| {
            discard_blobs(&self.backend.objects, images.iter().map(|i| i.key.clone()), "unsaved recipe");
        })
    }

    /// Recipes, newest first.
    pub fn list_recipes(&self, caller: &Caller, audience: Audience) -> AppResult<Vec<Recipe>> {
        let mut recipes = self.gate.list_visible::<Recipe>(caller, audience, Filter::all())?;
        recipes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(recipes)
    }

    /// Approved recipes that use a product.
    pub fn recipes_using(&self, product_id: &ProductId) -> AppResult<Vec<Recipe>> {
        Ok(self
            .list_recipes(&Caller::Anonymous, Audience::Public)?
            .into_iter()
            .filter(|r| r.uses_product(*product_id))
            .collect())
    }

    pub fn get_recipe(&self, caller: &Caller, id: &RecipeId) -> AppResult<Option<Recipe>> {
        self.gate.get_visible::<Recipe>(caller, id)
    }

    /// Remove a recipe (author or admin) and, best effort, its images.
    pub fn delete_recipe(&self, caller: &Caller, id: &RecipeId) -> AppResult<BlobCleanup> {
        let recipe = self.backend.store.fetch::<Recipe>(id)?.ok_or(DomainError::NotFound)?;
        ensure_owner_or_admin(&self.backend.admins, caller, recipe.author)?;

        let mut batch = WriteBatch::new();
        batch.remove_existing::<Recipe>(id);
        self.backend.store.commit(batch)?;

        Ok(discard_blobs(&self.backend.objects, recipe.blob_keys(), "deleted recipe"))
    }

    // -- reviews ----------------------------------------------------------

    /// Post a review of an approved product.
    ///
    /// The review is public immediately; its images start pending and are
    /// moderated one by one. Review and image records share one batch.
    pub fn post_review(
        &self,
        caller: &Caller,
        product_id: &ProductId,
        draft: &ReviewDraft,
        uploads: Vec<ImageUpload>,
    ) -> AppResult<ReviewId> {
        let ctx = Self::authenticated(caller)?;
        let product = self
            .backend
            .store
            .fetch::<Product>(product_id)?
            .filter(|p| p.is_visible_to(Audience::Public))
            .ok_or(DomainError::NotFound)?;

        let now = Utc::now();
        let review = Review::post(ReviewId::new(), product.id, ctx.user_id(), draft, now)?;
        validate_uploads(&uploads, 0, &self.backend.limits)?;

        let uploaded = store_uploads(&self.backend.objects, Review::COLLECTION, review.id, uploads)?;
        let mut batch = WriteBatch::new();
        batch.create(&review)?;
        for image in &uploaded {
            batch.create(&ReviewImage::attach(&review, image.clone(), now))?;
        }
        self.commit_with_uploads(batch, &uploaded)?;

        tracing::info!(
            review_id = %review.id,
            %product_id,
            user_id = %ctx.user_id(),
            pending_images = uploaded.len(),
            "review posted"
        );
        Ok(review.id)
    }

    /// Reviews of a product, newest first, each showing approved images only.
    pub fn product_reviews(&self, product_id: &ProductId) -> AppResult<Vec<ReviewView>> {
        let by_product = Filter::all().eq_id("product_id", product_id);
        let mut reviews = self.backend.store.find::<Review>(&by_product)?;
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

        let mut images: HashMap<ReviewId, Vec<ReviewImage>> = HashMap::new();
        for image in self.backend.store.find::<ReviewImage>(&by_product)? {
            images.entry(image.review_id).or_default().push(image);
        }

        Ok(reviews
            .into_iter()
            .map(|review| {
                let attached = images.remove(&review.id).unwrap_or_default();
                ReviewView::assemble(review, attached)
            })
            .collect())
    }

    pub fn rating_summary(&self, product_id: &ProductId) -> AppResult<RatingSummary> {
        let reviews = self
            .backend
            .store
            .find::<Review>(&Filter::all().eq_id("product_id", product_id))?;
        Ok(RatingSummary::from_reviews(&reviews))
    }

    /// Review images awaiting moderation, oldest first.
    pub fn pending_review_images(&self, caller: &Caller) -> AppResult<Vec<ReviewImage>> {
        let mut images = self
            .gate
            .list_visible::<ReviewImage>(caller, Audience::Moderators, Filter::all())?;
        images.sort_by_key(|i| i.created_at);
        Ok(images)
    }

    /// Delete a review (author or admin) with all of its image records.
    pub fn delete_review(&self, caller: &Caller, review_id: &ReviewId) -> AppResult<BlobCleanup> {
        let review = self
            .backend
            .store
            .fetch::<Review>(review_id)?
            .ok_or(DomainError::NotFound)?;
        let ctx = ensure_owner_or_admin(&self.backend.admins, caller, review.author)?;

        let images = self
            .backend
            .store
            .find::<ReviewImage>(&Filter::all().eq_id("review_id", review_id))?;

        let mut batch = WriteBatch::new();
        batch.remove_existing::<Review>(review_id);
        for image in &images {
            batch.delete::<ReviewImage>(&image.id);
        }
        self.backend.store.commit(batch)?;

        let cleanup = discard_blobs(
            &self.backend.objects,
            images.iter().flat_map(Moderated::blob_keys),
            "deleted review",
        );
        tracing::info!(%review_id, user_id = %ctx.user_id(), images = images.len(), "review deleted");
        Ok(cleanup)
    }
}
