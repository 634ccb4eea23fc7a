//! Deferred cleanup of orphaned image blobs.
//!
//! Rejections and cascade deletes only try once to remove binaries. Whatever
//! they leave behind is collected here: any object under an image prefix that
//! no live document references and that is older than the grace period.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use tastemark_catalog::{Product, ProductEdit, Recipe, ReviewImage};
use tastemark_core::{BlobKey, Moderated};

use crate::document_store::{DocumentStore, DocumentStoreExt, Filter, StoreError};
use crate::object_store::{BlobError, ObjectStore};

/// Key prefixes holding user-uploaded images.
pub const IMAGE_PREFIXES: [&str; 4] = ["products/", "product_edits/", "recipes/", "reviews/"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub scanned: usize,
    pub referenced: usize,
    pub skipped_recent: usize,
    pub deleted: usize,
    pub failed: usize,
}

#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Blob(#[from] BlobError),
}

pub struct BlobSweeper<S, O> {
    store: S,
    objects: O,
    grace: Duration,
}

impl<S, O> BlobSweeper<S, O>
where
    S: DocumentStore,
    O: ObjectStore,
{
    pub fn new(store: S, objects: O, grace: Duration) -> Self {
        Self { store, objects, grace }
    }

    /// Every blob key a live document points at.
    ///
    /// Applied edit proposals are history; their images count only if the
    /// product itself still uses them.
    pub fn referenced_keys(&self) -> Result<HashSet<BlobKey>, StoreError> {
        let mut keys = HashSet::new();
        for p in self.store.find::<Product>(&Filter::all())? {
            keys.extend(p.blob_keys());
        }
        for e in self.store.find::<ProductEdit>(&Filter::all().eq(ProductEdit::APPROVED_FIELD, false))? {
            keys.extend(e.details.blob_keys());
        }
        for r in self.store.find::<Recipe>(&Filter::all())? {
            keys.extend(r.blob_keys());
        }
        for i in self.store.find::<ReviewImage>(&Filter::all())? {
            keys.extend(i.blob_keys());
        }
        Ok(keys)
    }

    /// Run one sweep. Failing to delete a single object is logged and counted;
    /// failing to list or to read the references aborts the sweep.
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, SweepError> {
        let referenced = self.referenced_keys()?;
        // A grace period reaching past the representable past protects everything.
        let cutoff = now.checked_sub_signed(self.grace);
        let mut report = SweepReport::default();

        for prefix in IMAGE_PREFIXES {
            for meta in self.objects.list(prefix)? {
                report.scanned += 1;
                if referenced.contains(&meta.key) {
                    report.referenced += 1;
                    continue;
                }
                if cutoff.is_none_or(|c| meta.created_at > c) {
                    report.skipped_recent += 1;
                    continue;
                }
                match self.objects.delete(&meta.key) {
                    Ok(()) => report.deleted += 1,
                    Err(err) => {
                        tracing::warn!(key = %meta.key, error = %err, "orphaned blob could not be deleted");
                        report.failed += 1;
                    }
                }
            }
        }

        tracing::info!(
            scanned = report.scanned,
            deleted = report.deleted,
            failed = report.failed,
            "blob sweep finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::document_store::InMemoryDocumentStore;
    use crate::object_store::InMemoryObjectStore;
    use tastemark_catalog::{ProductDetails, ProductDraft};
    use tastemark_core::{ImageRef, ProductId, UserId};

    fn product_with(key: &BlobKey) -> Product {
        let details = ProductDetails::from_draft(
            &ProductDraft {
                name: "Kimchi".into(),
                category: "ferments".into(),
                description: String::new(),
            },
            vec![ImageRef::new(key.clone(), "image/jpeg")],
        )
        .unwrap();
        Product::submit(ProductId::new(), details, UserId::new(), Utc::now())
    }

    #[test]
    fn deletes_only_old_unreferenced_blobs() {
        let store = InMemoryDocumentStore::arc();
        let objects = InMemoryObjectStore::arc();
        let old = Utc::now() - Duration::days(3);

        let kept = BlobKey::new("products/p/kept.jpg");
        let orphan = BlobKey::new("products/p/orphan.jpg");
        let fresh_orphan = BlobKey::new("reviews/r/fresh.jpg");
        let unrelated = BlobKey::new("exports/report.csv");

        store.save(&product_with(&kept)).unwrap();
        objects.put_at(&kept, "image/jpeg", vec![1], old).unwrap();
        objects.put_at(&orphan, "image/jpeg", vec![1], old).unwrap();
        objects.put(&fresh_orphan, "image/jpeg", vec![1]).unwrap();
        objects.put_at(&unrelated, "text/csv", vec![1], old).unwrap();

        let sweeper = BlobSweeper::new(Arc::clone(&store), Arc::clone(&objects), Duration::days(1));
        let report = sweeper.sweep(Utc::now()).unwrap();

        assert_eq!(
            report,
            SweepReport { scanned: 3, referenced: 1, skipped_recent: 1, deleted: 1, failed: 0 }
        );
        assert!(objects.contains(&kept));
        assert!(!objects.contains(&orphan));
        assert!(objects.contains(&fresh_orphan));
        assert!(objects.contains(&unrelated));
    }

    #[test]
    fn delete_failures_are_counted_not_fatal() {
        let store = InMemoryDocumentStore::arc();
        let objects = InMemoryObjectStore::arc();
        let old = Utc::now() - Duration::days(3);
        objects.put_at(&BlobKey::new("recipes/x/a.jpg"), "image/jpeg", vec![1], old).unwrap();
        objects.put_at(&BlobKey::new("recipes/x/b.jpg"), "image/jpeg", vec![1], old).unwrap();
        objects.fail_deletes(true);

        let sweeper = BlobSweeper::new(store, Arc::clone(&objects), Duration::hours(1));
        let report = sweeper.sweep(Utc::now()).unwrap();
        assert_eq!((report.failed, report.deleted), (2, 0));
        assert_eq!(objects.len(), 2);
    }

    #[test]
    fn an_unrepresentable_grace_period_keeps_every_blob() {
        let store = InMemoryDocumentStore::arc();
        let objects = InMemoryObjectStore::arc();
        objects
            .put_at(&BlobKey::new("products/p/a.jpg"), "image/jpeg", vec![1], Utc::now() - Duration::days(400))
            .unwrap();

        let sweeper = BlobSweeper::new(store, Arc::clone(&objects), Duration::MAX);
        let report = sweeper.sweep(Utc::now()).unwrap();
        assert_eq!((report.skipped_recent, report.deleted), (1, 0));
        assert_eq!(objects.len(), 1);
    }

    #[test]
    fn unreadable_references_abort_before_deleting_anything() {
        let store = InMemoryDocumentStore::arc();
        let objects = InMemoryObjectStore::arc();
        objects
            .put_at(&BlobKey::new("products/p/a.jpg"), "image/jpeg", vec![1], Utc::now() - Duration::days(9))
            .unwrap();
        store.fail_reads(true);

        let sweeper = BlobSweeper::new(Arc::clone(&store), Arc::clone(&objects), Duration::hours(1));
        assert!(matches!(sweeper.sweep(Utc::now()), Err(SweepError::Store(_))));
        assert_eq!(objects.len(), 1);
    }
}
