//! Moving image bytes into the object store and back out again.

use tastemark_catalog::ImageUpload;
use tastemark_core::{BlobKey, ImageRef};
use tastemark_infra::{BlobError, ObjectStore};

/// Result of a best-effort blob removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobCleanup {
    pub deleted: usize,
    /// Keys that could not be removed; the sweeper picks them up later.
    pub orphaned: Vec<BlobKey>,
}

/// Store every upload under `{collection}/{owner}/`.
///
/// If one upload fails, the ones already stored are removed (best effort) and
/// the error is returned, so no metadata is ever written for a partial set.
pub fn store_uploads<O>(
    objects: &O,
    collection: &str,
    owner: impl core::fmt::Display,
    uploads: Vec<ImageUpload>,
) -> Result<Vec<ImageRef>, BlobError>
where
    O: ObjectStore + ?Sized,
{
    let owner = owner.to_string();
    let mut stored = Vec::with_capacity(uploads.len());

    for upload in uploads {
        let key = BlobKey::allocate(collection, &owner, upload.extension());
        match objects.put(&key, &upload.content_type, upload.bytes) {
            Ok(_) => stored.push(ImageRef::new(key, upload.content_type)),
            Err(err) => {
                tracing::warn!(%key, error = %err, "image upload failed");
                discard_blobs(objects, stored.iter().map(|i| i.key.clone()), "failed upload set");
                return Err(err);
            }
        }
    }
    Ok(stored)
}

/// Delete blobs once, logging whatever cannot be removed. Never fails.
pub fn discard_blobs<O, I>(objects: &O, keys: I, reason: &str) -> BlobCleanup
where
    O: ObjectStore + ?Sized,
    I: IntoIterator<Item = BlobKey>,
{
    let mut cleanup = BlobCleanup::default();
    for key in keys {
        match objects.delete(&key) {
            Ok(()) => cleanup.deleted += 1,
            Err(err) => {
                tracing::warn!(%key, reason, error = %err, "blob left orphaned");
                cleanup.orphaned.push(key);
            }
        }
    }
    cleanup
}

#[cfg(test)]
mod tests {
    use super::*;
    use tastemark_infra::InMemoryObjectStore;

    fn jpeg() -> ImageUpload {
        ImageUpload::new("a.jpg", "image/jpeg", vec![1, 2, 3])
    }

    #[test]
    fn uploads_land_under_the_owner_prefix() {
        let objects = InMemoryObjectStore::new();
        let refs = store_uploads(&objects, "products", "p1", vec![jpeg(), jpeg()]).unwrap();

        assert_eq!(refs.len(), 2);
        assert!(refs.iter().all(|r| r.key.has_prefix("products/p1/") && r.key.as_str().ends_with(".jpg")));
        assert_eq!(objects.len(), 2);
    }

    #[test]
    fn failed_put_reports_error_and_keeps_nothing() {
        let objects = InMemoryObjectStore::new();
        objects.fail_puts(true);
        assert!(store_uploads(&objects, "reviews", "r1", vec![jpeg()]).is_err());
        assert!(objects.is_empty());
    }

    #[test]
    fn discard_counts_failures_instead_of_returning_them() {
        let objects = InMemoryObjectStore::new();
        let keys = store_uploads(&objects, "recipes", "x", vec![jpeg()])
            .unwrap()
            .into_iter()
            .map(|i| i.key)
            .collect::<Vec<_>>();

        objects.fail_deletes(true);
        let cleanup = discard_blobs(&objects, keys.clone(), "test");
        assert_eq!(cleanup, BlobCleanup { deleted: 0, orphaned: keys });

        objects.fail_deletes(false);
        let cleanup = discard_blobs(&objects, cleanup.orphaned, "retry");
        assert_eq!(cleanup.deleted, 1);
        assert!(objects.is_empty());
    }
}
