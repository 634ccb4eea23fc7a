//! Configuration loading and representation.

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use tastemark_catalog::UploadLimits;
use tastemark_core::Email;

pub const ENV_MAX_IMAGE_BYTES: &str = "TASTEMARK_MAX_IMAGE_BYTES";
pub const ENV_MAX_IMAGES: &str = "TASTEMARK_MAX_IMAGES";
pub const ENV_BLOB_GC_GRACE_SECS: &str = "TASTEMARK_BLOB_GC_GRACE_SECS";
pub const ENV_BOOTSTRAP_ADMINS: &str = "TASTEMARK_BOOTSTRAP_ADMINS";

/// Longest accepted sweep grace period: ten years.
pub const MAX_BLOB_GC_GRACE_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TastemarkConfig {
    pub max_image_bytes: usize,
    pub max_images_per_submission: usize,
    /// Unreferenced blobs younger than this survive a sweep.
    pub blob_gc_grace_secs: u64,
    pub bootstrap_admins: Vec<Email>,
}

impl Default for TastemarkConfig {
    fn default() -> Self {
        let limits = UploadLimits::default();
        Self {
            max_image_bytes: limits.max_image_bytes,
            max_images_per_submission: limits.max_images,
            blob_gc_grace_secs: 24 * 60 * 60,
            bootstrap_admins: Vec::new(),
        }
    }
}

impl TastemarkConfig {
    /// Load from process environment, falling back to defaults per field.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (environment, test map, ...).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_MAX_IMAGE_BYTES) {
            config.max_image_bytes = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_MAX_IMAGE_BYTES} must be a byte count, got {raw:?}"))?;
        }
        if let Some(raw) = lookup(ENV_MAX_IMAGES) {
            config.max_images_per_submission = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_MAX_IMAGES} must be a count, got {raw:?}"))?;
        }
        if let Some(raw) = lookup(ENV_BLOB_GC_GRACE_SECS) {
            config.blob_gc_grace_secs = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_BLOB_GC_GRACE_SECS} must be seconds, got {raw:?}"))?;
        }
        if let Some(raw) = lookup(ENV_BOOTSTRAP_ADMINS) {
            config.bootstrap_admins = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Email::parse(s).with_context(|| format!("{ENV_BOOTSTRAP_ADMINS}: bad email {s:?}")))
                .collect::<Result<_>>()?;
        }

        anyhow::ensure!(config.max_image_bytes > 0, "{ENV_MAX_IMAGE_BYTES} must be positive");
        anyhow::ensure!(
            config.blob_gc_grace_secs <= MAX_BLOB_GC_GRACE_SECS,
            "{ENV_BLOB_GC_GRACE_SECS} must be at most {MAX_BLOB_GC_GRACE_SECS}, got {}",
            config.blob_gc_grace_secs
        );
        Ok(config)
    }

    pub fn upload_limits(&self) -> UploadLimits {
        UploadLimits {
            max_image_bytes: self.max_image_bytes,
            max_images: self.max_images_per_submission,
        }
    }

    /// Saturates instead of overflowing for values built without `from_lookup`.
    pub fn blob_gc_grace(&self) -> Duration {
        i64::try_from(self.blob_gc_grace_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }
}
