//! Reviews and their independently moderated images.
//!
//! A review is visible as soon as it is posted; only its photos go through
//! moderation. Whether a review still has photos awaiting approval is derived
//! from its image records and never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tastemark_core::{
    Approval, BlobKey, Document, DomainError, DomainResult, Entity, ImageRef, Moderated,
    ProductId, ReviewId, ReviewImageId, UserId,
};

/// Star rating, 1 to 5 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(stars: u8) -> DomainResult<Self> {
        if (Self::MIN..=Self::MAX).contains(&stars) {
            Ok(Self(stars))
        } else {
            Err(DomainError::validation(format!(
                "rating must be between {} and {}",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    pub fn stars(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(value: Rating) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDraft {
    pub rating: u8,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub author: UserId,
    pub rating: Rating,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn post(
        id: ReviewId,
        product_id: ProductId,
        author: UserId,
        draft: &ReviewDraft,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let rating = Rating::new(draft.rating)?;
        let body = draft.body.trim();
        if body.is_empty() {
            return Err(DomainError::validation("review text cannot be empty"));
        }
        Ok(Self {
            id,
            product_id,
            author,
            rating,
            body: body.to_string(),
            created_at: now,
        })
    }
}

impl Entity for Review {
    type Id = ReviewId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Document for Review {
    const COLLECTION: &'static str = "reviews";
}

/// A photo attached to a review (the review's `images` sub-collection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewImage {
    pub id: ReviewImageId,
    pub review_id: ReviewId,
    pub product_id: ProductId,
    pub image: ImageRef,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

impl ReviewImage {
    pub fn attach(review: &Review, image: ImageRef, now: DateTime<Utc>) -> Self {
        Self {
            id: ReviewImageId::new(),
            review_id: review.id,
            product_id: review.product_id,
            image,
            approved: false,
            created_at: now,
        }
    }
}

impl Entity for ReviewImage {
    type Id = ReviewImageId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Document for ReviewImage {
    const COLLECTION: &'static str = "review_images";
}

impl Moderated for ReviewImage {
    const KIND: &'static str = "review_image";

    fn approval(&self) -> Approval {
        self.approved.into()
    }

    fn set_approval(&mut self, approval: Approval) {
        self.approved = approval.is_approved();
    }

    fn blob_keys(&self) -> Vec<BlobKey> {
        vec![self.image.key.clone()]
    }
}

/// What the public sees of one review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewView {
    pub review: Review,
    /// Approved images only.
    pub images: Vec<ImageRef>,
    pub total_images: usize,
    pub approved_images: usize,
}

impl ReviewView {
    /// Build the public view from the review and all of its image records.
    ///
    /// Images belonging to other reviews are ignored.
    pub fn assemble(review: Review, mut images: Vec<ReviewImage>) -> Self {
        images.retain(|i| i.review_id == review.id);
        images.sort_by_key(|i| i.created_at);

        let total_images = images.len();
        let visible: Vec<ImageRef> = images
            .into_iter()
            .filter(|i| i.approved)
            .map(|i| i.image)
            .collect();

        Self {
            review,
            approved_images: visible.len(),
            images: visible,
            total_images,
        }
    }

    pub fn has_pending_images(&self) -> bool {
        self.total_images != self.approved_images
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingSummary {
    pub count: usize,
    /// `None` when nobody reviewed the product yet.
    pub average: Option<f64>,
}

impl RatingSummary {
    pub fn from_reviews<'a>(reviews: impl IntoIterator<Item = &'a Review>) -> Self {
        let (count, total) = reviews
            .into_iter()
            .fold((0_usize, 0_u64), |(n, sum), r| (n + 1, sum + u64::from(r.rating.stars())));
        Self {
            count,
            average: (count > 0).then(|| total as f64 / count as f64),
        }
    }
}
