//! The `admins` collection: the single source of admin rights.
//!
//! Admins are keyed by normalized email. Who may change the directory is
//! decided by the application layer; this type only reads and writes grants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tastemark_auth::{AdminCapability, AuthContext, CapabilityError};
use tastemark_core::{Document, Email, Entity, UserId};

use crate::document_store::{DocumentStore, DocumentStoreExt, Filter, StoreError, WriteBatch};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminGrant {
    pub email: Email,
    /// `None` for grants seeded from configuration.
    pub granted_by: Option<UserId>,
    pub granted_at: DateTime<Utc>,
}

impl Entity for AdminGrant {
    type Id = Email;

    fn id(&self) -> &Self::Id {
        &self.email
    }
}

impl Document for AdminGrant {
    const COLLECTION: &'static str = "admins";
}

#[derive(Debug, Clone)]
pub struct AdminDirectory<S> {
    store: S,
}

impl<S: DocumentStore> AdminDirectory<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn grant(&self, email: Email, granted_by: Option<UserId>, now: DateTime<Utc>) -> Result<AdminGrant, StoreError> {
        if let Some(existing) = self.store.fetch::<AdminGrant>(&email)? {
            return Ok(existing);
        }
        let grant = AdminGrant {
            email,
            granted_by,
            granted_at: now,
        };
        self.store.save(&grant)?;
        Ok(grant)
    }

    /// Remove the grant for `email` in a batch that also requires the grant
    /// for `keep` to still exist, so concurrent revocations can never empty
    /// the directory. Either grant missing at commit time is a precondition
    /// failure and nothing is removed.
    pub fn revoke_keeping(&self, email: &Email, keep: &Email) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch
            .remove_existing::<AdminGrant>(email)
            .assert_exists::<AdminGrant>(keep);
        self.store.commit(batch)
    }

    pub fn list(&self) -> Result<Vec<AdminGrant>, StoreError> {
        self.store.find(&Filter::all())
    }

    /// Seed grants from configuration; existing grants are left untouched.
    pub fn bootstrap(&self, emails: &[Email], now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut added = 0;
        for email in emails {
            if self.store.fetch::<AdminGrant>(email)?.is_none() {
                self.grant(email.clone(), None, now)?;
                added += 1;
            }
        }
        if added > 0 {
            tracing::info!(added, "seeded admin directory");
        }
        Ok(added)
    }
}

impl<S: DocumentStore> AdminCapability for AdminDirectory<S> {
    fn is_admin(&self, caller: &AuthContext) -> Result<bool, CapabilityError> {
        self.store
            .fetch::<AdminGrant>(caller.email())
            .map(|grant| grant.is_some())
            .map_err(|e| CapabilityError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_store::InMemoryDocumentStore;
    use std::sync::Arc;
    use tastemark_auth::{Capability, Caller, resolve_capability};

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[test]
    fn lookup_is_case_insensitive_via_normalized_email() {
        let store = InMemoryDocumentStore::arc();
        let directory = AdminDirectory::new(store);
        directory.grant(email("Mod@Site.io"), None, Utc::now()).unwrap();

        let ctx = AuthContext::new(UserId::new(), email("mod@site.IO"));
        assert!(directory.is_admin(&ctx).unwrap());

        let other = AuthContext::new(UserId::new(), email("user@site.io"));
        assert!(!directory.is_admin(&other).unwrap());
    }

    #[test]
    fn store_outage_resolves_to_member() {
        let store = InMemoryDocumentStore::arc();
        let directory = AdminDirectory::new(Arc::clone(&store));
        directory.grant(email("mod@site.io"), None, Utc::now()).unwrap();

        store.fail_reads(true);
        let caller = Caller::user(AuthContext::new(UserId::new(), email("mod@site.io")));
        assert_eq!(resolve_capability(&directory, &caller), Capability::Member);
    }

    #[test]
    fn bootstrap_is_idempotent_and_revocation_needs_a_survivor() {
        let directory = AdminDirectory::new(InMemoryDocumentStore::arc());
        let seed = vec![email("a@x.io"), email("b@x.io")];

        assert_eq!(directory.bootstrap(&seed, Utc::now()).unwrap(), 2);
        assert_eq!(directory.bootstrap(&seed, Utc::now()).unwrap(), 0);
        assert_eq!(directory.list().unwrap().len(), 2);

        directory.revoke_keeping(&email("a@x.io"), &email("b@x.io")).unwrap();
        assert!(matches!(
            directory.revoke_keeping(&email("b@x.io"), &email("a@x.io")),
            Err(StoreError::Precondition(_))
        ));
        let remaining: Vec<Email> = directory.list().unwrap().into_iter().map(|g| g.email).collect();
        assert_eq!(remaining, vec![email("b@x.io")]);
    }
}
