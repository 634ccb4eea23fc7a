//! Application services for the review site.
//!
//! Every operation takes the caller explicitly and talks to the document and
//! object stores through the infra boundaries. Moderation rules live in
//! [`moderation::ModerationGate`]; the other services route submissions
//! through it.

pub mod admins;
pub mod backend;
pub mod catalog;
pub mod chat;
pub mod error;
pub mod live;
pub mod moderation;
pub mod uploads;

pub use admins::AdminService;
pub use backend::{Backend, InMemoryBackend};
pub use catalog::CatalogService;
pub use chat::ChatBoard;
pub use error::{AppError, AppResult, ErrorCategory};
pub use live::LiveQuery;
pub use moderation::{ApprovalOutcome, ModerationGate, RejectionReport};
