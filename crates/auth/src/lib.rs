//! `tastemark-auth`: caller identity and the admin capability check.
//!
//! Identity is always passed explicitly; nothing here reads ambient state,
//! touches storage or knows about transport.

pub mod authorize;
pub mod capability;
pub mod context;
pub mod profile;

pub use authorize::{AuthzError, ensure_owner_or_admin, require_admin};
pub use capability::{AdminCapability, Capability, CapabilityError, resolve_capability};
pub use context::{AuthContext, Caller};
pub use profile::{UserProfile, display_name_for};
