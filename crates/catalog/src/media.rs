//! Image uploads attached to submissions.

use tastemark_core::{DomainError, DomainResult};

/// Limits applied to every submission's images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_image_bytes: usize,
    pub max_images: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_image_bytes: 5 * 1024 * 1024,
            max_images: 6,
        }
    }
}

/// A raw image as received from the client form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// File extension used for the stored object key.
    pub fn extension(&self) -> &str {
        match self.content_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            "image/heic" => "heic",
            _ => self
                .file_name
                .rsplit_once('.')
                .map(|(_, ext)| ext)
                .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
                .unwrap_or("bin"),
        }
    }

    pub fn validate(&self, limits: &UploadLimits) -> DomainResult<()> {
        if !self.content_type.starts_with("image/") {
            return Err(DomainError::validation(format!(
                "{} is not an image ({})",
                self.file_name, self.content_type
            )));
        }
        if self.bytes.is_empty() {
            return Err(DomainError::validation(format!("{} is empty", self.file_name)));
        }
        if self.bytes.len() > limits.max_image_bytes {
            return Err(DomainError::validation(format!(
                "{} exceeds the {} byte limit",
                self.file_name, limits.max_image_bytes
            )));
        }
        Ok(())
    }
}

/// Validate a whole batch; `already_attached` counts images kept from before.
pub fn validate_uploads(
    uploads: &[ImageUpload],
    already_attached: usize,
    limits: &UploadLimits,
) -> DomainResult<()> {
    if uploads.len() + already_attached > limits.max_images {
        return Err(DomainError::validation(format!(
            "at most {} images per submission",
            limits.max_images
        )));
    }
    uploads.iter().try_for_each(|u| u.validate(limits))
}
