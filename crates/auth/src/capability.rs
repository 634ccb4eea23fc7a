//! Admin capability resolution.
//!
//! There is exactly one authoritative source of admin rights, reached through
//! [`AdminCapability`]. A failed lookup is never treated as a grant.

use thiserror::Error;

use crate::context::{AuthContext, Caller};

/// Resolved rights of a caller for moderation purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Anonymous,
    Member,
    Admin,
}

impl Capability {
    pub fn is_admin(self) -> bool {
        self == Capability::Admin
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("capability lookup failed: {0}")]
pub struct CapabilityError(pub String);

/// Source of truth for "is this caller an admin?".
pub trait AdminCapability: Send + Sync {
    fn is_admin(&self, caller: &AuthContext) -> Result<bool, CapabilityError>;
}

impl<T> AdminCapability for std::sync::Arc<T>
where
    T: AdminCapability + ?Sized,
{
    fn is_admin(&self, caller: &AuthContext) -> Result<bool, CapabilityError> {
        (**self).is_admin(caller)
    }
}

/// Resolve a caller's capability, failing closed.
///
/// Lookup errors demote the caller to `Member` and are logged.
pub fn resolve_capability<A>(source: &A, caller: &Caller) -> Capability
where
    A: AdminCapability + ?Sized,
{
    let Some(ctx) = caller.auth() else {
        return Capability::Anonymous;
    };

    match source.is_admin(ctx) {
        Ok(true) => Capability::Admin,
        Ok(false) => Capability::Member,
        Err(err) => {
            tracing::warn!(user_id = %ctx.user_id(), error = %err, "admin lookup failed; treating caller as non-admin");
            Capability::Member
        }
    }
}
