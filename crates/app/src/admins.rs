//! Granting and revoking admin rights.

use chrono::Utc;

use tastemark_auth::{AdminCapability, Caller, require_admin};
use tastemark_core::{DomainError, Email};
use tastemark_infra::{AdminDirectory, AdminGrant, DocumentStore};

use crate::error::AppResult;

/// Admin-only management of the `admins` collection.
///
/// Checks run against `capability`, which in production is the same
/// directory this service writes to.
#[derive(Debug, Clone)]
pub struct AdminService<S, A> {
    directory: AdminDirectory<S>,
    capability: A,
}

impl<S, A> AdminService<S, A>
where
    S: DocumentStore,
    A: AdminCapability,
{
    pub fn new(directory: AdminDirectory<S>, capability: A) -> Self {
        Self { directory, capability }
    }

    pub fn list_admins(&self, caller: &Caller) -> AppResult<Vec<AdminGrant>> {
        require_admin(&self.capability, caller)?;
        let mut grants = self.directory.list()?;
        grants.sort_by(|a, b| a.email.as_str().cmp(b.email.as_str()));
        Ok(grants)
    }

    /// Grant admin rights; granting to an existing admin changes nothing.
    pub fn grant_admin(&self, caller: &Caller, email: &str) -> AppResult<AdminGrant> {
        let ctx = require_admin(&self.capability, caller)?;
        let email = Email::parse(email)?;
        let grant = self.directory.grant(email, Some(ctx.user_id()), Utc::now())?;
        tracing::info!(email = %grant.email, granted_by = %ctx.email(), "admin granted");
        Ok(grant)
    }

    /// Revoke admin rights. The last remaining admin cannot be revoked.
    ///
    /// The revocation commits only while another grant still exists, so two
    /// admins revoking each other at once leave one of them in place; the
    /// loser gets a conflict.
    pub fn revoke_admin(&self, caller: &Caller, email: &str) -> AppResult<bool> {
        let ctx = require_admin(&self.capability, caller)?;
        let email = Email::parse(email)?;

        let grants = self.directory.list()?;
        if !grants.iter().any(|g| g.email == email) {
            return Ok(false);
        }
        let Some(survivor) = grants.iter().find(|g| g.email != email) else {
            return Err(DomainError::conflict("cannot revoke the last admin").into());
        };

        self.directory.revoke_keeping(&email, &survivor.email)?;
        tracing::info!(%email, revoked_by = %ctx.email(), "admin revoked");
        Ok(true)
    }
}
