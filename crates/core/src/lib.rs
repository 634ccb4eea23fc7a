//! `tastemark-core`: shared domain building blocks.
//!
//! Identifiers, the domain error model, approval state and the `Document`
//! contract every stored entity implements. No IO lives here.

pub mod approval;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use approval::{Approval, Audience, Moderated};
pub use entity::{Document, Entity};
pub use error::{DomainError, DomainResult};
pub use id::{
    BlobKey, CommentId, PostId, ProductEditId, ProductId, RecipeId, ReviewId, ReviewImageId,
    UserId,
};
pub use value_object::{Email, ImageRef, ValueObject};
