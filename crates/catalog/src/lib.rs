//! Catalog domain: products, edit proposals, recipes and reviews.
//!
//! Pure domain logic only (validation, state transitions, derived views).
//! Persistence and authorization happen in the application layer.

pub mod edit;
pub mod media;
pub mod product;
pub mod recipe;
pub mod review;

pub use edit::{EditOutcome, ProductEdit};
pub use media::{ImageUpload, UploadLimits, validate_uploads};
pub use product::{Product, ProductDetails, ProductDraft};
pub use recipe::{Recipe, RecipeDraft};
pub use review::{Rating, RatingSummary, Review, ReviewDraft, ReviewImage, ReviewView};
