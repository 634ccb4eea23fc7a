use thiserror::Error;

use tastemark_core::{DomainError, UserId};

use crate::capability::{AdminCapability, Capability, resolve_capability};
use crate::context::{AuthContext, Caller};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Forbidden(&'static str),
}

impl From<AuthzError> for DomainError {
    fn from(_: AuthzError) -> Self {
        DomainError::Unauthorized
    }
}

/// Require the admin capability for a moderation operation.
pub fn require_admin<'a, A>(source: &A, caller: &'a Caller) -> Result<&'a AuthContext, AuthzError>
where
    A: AdminCapability + ?Sized,
{
    match (resolve_capability(source, caller), caller.auth()) {
        (Capability::Admin, Some(ctx)) => Ok(ctx),
        (Capability::Anonymous, _) | (_, None) => Err(AuthzError::Unauthenticated),
        (Capability::Member, Some(_)) => Err(AuthzError::Forbidden("admin capability required")),
    }
}

/// Allow the resource owner, or an admin, to act on a resource.
pub fn ensure_owner_or_admin<'a, A>(
    source: &A,
    caller: &'a Caller,
    owner: UserId,
) -> Result<&'a AuthContext, AuthzError>
where
    A: AdminCapability + ?Sized,
{
    let ctx = caller.auth().ok_or(AuthzError::Unauthenticated)?;
    if ctx.user_id() == owner {
        return Ok(ctx);
    }
    if resolve_capability(source, caller).is_admin() {
        Ok(ctx)
    } else {
        Err(AuthzError::Forbidden("only the author or an admin may do this"))
    }
}
