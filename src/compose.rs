//! Post composer: local validation, image upload and post creation.
//!
//! Everything that can be checked without the network is checked here first.
//! A draft that fails validation never produces a request.

use crate::api::{ApiClient, ApiError, NewPost, Post};
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MAX_TAG_CHARS: usize = 16;
pub const MAX_TAGS: usize = 10;
pub const MAX_TITLE_CHARS: usize = 120;
/// Largest image the server accepts (10 MB).
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Only PNG and JPEG images are supported")]
    UnsupportedImage,
    #[error("File extension does not match its contents")]
    ExtensionMismatch,
    #[error("Image is {size} bytes (max 10 MB)")]
    ImageTooLarge { size: u64 },
    #[error("Cannot read {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Not a regular file: {0}")]
    NotAFile(String),
    #[error("Tag must be 16 characters or less")]
    TagTooLong,
    #[error("At most 10 tags per post")]
    TooManyTags,
    #[error("Title is required")]
    TitleRequired,
    #[error("Title must be 120 characters or less")]
    TitleTooLong,
    #[error("Select an image first")]
    ImageMissing,
}

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

// ============================================================================
// Image checks
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    pub fn mime(self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
        }
    }

    fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(ImageKind::Png),
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            _ => None,
        }
    }

    fn from_magic(head: &[u8]) -> Option<Self> {
        if head.starts_with(PNG_MAGIC) {
            Some(ImageKind::Png)
        } else if head.starts_with(JPEG_MAGIC) {
            Some(ImageKind::Jpeg)
        } else {
            None
        }
    }
}

/// Expand a leading `~/` against `$HOME`.
pub fn expand_home(raw: &str) -> PathBuf {
    let raw = raw.trim();
    match (raw.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(raw),
    }
}

/// Check that `path` is a PNG or JPEG within the size limit.
///
/// The extension and the leading magic bytes must both name the same format.
pub fn validate_image_path(path: &Path) -> Result<ImageKind, ValidationError> {
    let by_ext = ImageKind::from_extension(path).ok_or(ValidationError::UnsupportedImage)?;

    let unreadable = |source| ValidationError::Unreadable {
        path: path.display().to_string(),
        source,
    };
    let meta = std::fs::metadata(path).map_err(unreadable)?;
    if !meta.is_file() {
        return Err(ValidationError::NotAFile(path.display().to_string()));
    }
    if meta.len() > MAX_IMAGE_BYTES {
        return Err(ValidationError::ImageTooLarge { size: meta.len() });
    }

    let mut head = [0u8; 8];
    let mut file = std::fs::File::open(path).map_err(unreadable)?;
    let read = file.read(&mut head).map_err(unreadable)?;

    match ImageKind::from_magic(&head[..read]) {
        Some(kind) if kind == by_ext => Ok(kind),
        Some(_) => Err(ValidationError::ExtensionMismatch),
        None => Err(ValidationError::UnsupportedImage),
    }
}

// ============================================================================
// Draft
// ============================================================================

/// A post being composed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    image_url: Option<String>,
    pub title: String,
    tags: Vec<String>,
}

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn set_image(&mut self, url: String) {
        self.image_url = Some(url);
    }

    /// Drop the image. The rest of the draft goes with it.
    pub fn clear_image(&mut self) {
        *self = Self::default();
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn tags_full(&self) -> bool {
        self.tags.len() >= MAX_TAGS
    }

    /// Add a tag. Returns `Ok(true)` if it was appended.
    ///
    /// Blank input and exact duplicates are ignored without error.
    pub fn add_tag(&mut self, raw: &str) -> Result<bool, ValidationError> {
        let tag = raw.trim();
        if tag.chars().count() > MAX_TAG_CHARS {
            return Err(ValidationError::TagTooLong);
        }
        if tag.is_empty() || self.tags.iter().any(|t| t == tag) {
            return Ok(false);
        }
        if self.tags_full() {
            return Err(ValidationError::TooManyTags);
        }
        self.tags.push(tag.to_string());
        Ok(true)
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }

    pub fn pop_tag(&mut self) -> Option<String> {
        self.tags.pop()
    }

    /// Check the draft and build the create request.
    pub fn validate(&self) -> Result<NewPost, ValidationError> {
        let image_url = self
            .image_url
            .clone()
            .ok_or(ValidationError::ImageMissing)?;
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::TitleRequired);
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(ValidationError::TitleTooLong);
        }
        Ok(NewPost {
            image_url,
            title: title.to_string(),
            tags: self.tags.clone(),
        })
    }
}

// ============================================================================
// Network steps
// ============================================================================

/// Validate and upload an image, returning its server URL.
pub async fn upload(api: &ApiClient, path: &Path) -> Result<String, ComposeError> {
    let kind = validate_image_path(path)?;
    tracing::debug!(path = %path.display(), mime = kind.mime(), "Uploading image");
    Ok(api.upload_image(path, kind.mime()).await?)
}

/// Validate the draft and create the post.
pub async fn publish(api: &ApiClient, draft: &Draft) -> Result<Post, ComposeError> {
    let request = draft.validate()?;
    Ok(api.create_post(&request).await?)
}
