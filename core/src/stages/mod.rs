// imgflow/src/stages/mod.rs

//! Built-in task adapters for the image pipeline.
//!
//! Each adapter is a thin translation layer: it reads what it needs from the context, calls a
//! collaborator that returns `anyhow::Result`, and turns the outcome into a `StageResult`. The
//! collaborators are traits so storage and imaging backends stay outside the crate.

pub mod metadata;
pub mod notify;
pub mod persist;
pub mod thumbnail;
pub mod validate;

use crate::config::PipelineConfig;
use crate::core::context::ExecutionContext;
use crate::trigger::BUCKET_KEY;
use serde_json::Value;

pub use metadata::{DetectedLabel, ExtractMetadataStage, ImageMetadata, LabelDetector, MetadataExtractor};
pub use notify::NotifyStage;
pub use persist::PersistStage;
pub use thumbnail::{RenderedThumbnail, ThumbnailFormat, ThumbnailPlan, ThumbnailRenderer, ThumbnailStage};
pub use validate::ValidateStage;

/// Adapter names the standard pipeline refers to.
pub mod names {
  pub const VALIDATE: &str = "validate";
  pub const THUMBNAIL: &str = "thumbnail";
  pub const EXTRACT_METADATA: &str = "extract_metadata";
  pub const PERSIST: &str = "persist";
  pub const NOTIFY_SUCCESS: &str = "notify_success";
  pub const NOTIFY_FAILURE: &str = "notify_failure";
}

/// Status value stages write into their `*_status` output fields.
pub const STAGE_SUCCESS: &str = "SUCCESS";

/// Location of the source image for the current instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
  pub bucket: String,
  pub key: String,
}

impl ImageRef {
  pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
    Self {
      bucket: bucket.into(),
      key: key.into(),
    }
  }

  /// Bucket and key as recorded by validation, falling back to the trigger metadata, then to
  /// the configured source bucket and the item key.
  pub fn from_context(ctx: &ExecutionContext, config: &PipelineConfig) -> Self {
    let bucket = ctx
      .field_str("s3_bucket")
      .or_else(|| ctx.source_metadata().get(BUCKET_KEY).and_then(Value::as_str))
      .unwrap_or(config.source_bucket.as_str());
    let key = ctx.field_str("s3_key").unwrap_or_else(|| ctx.item_key());
    Self::new(bucket, key)
  }

  /// Last path segment of the key.
  pub fn file_name(&self) -> &str {
    self.key.rsplit('/').next().unwrap_or(&self.key)
  }

  /// File name without its extension.
  pub fn base_name(&self) -> &str {
    let file = self.file_name();
    match file.rfind('.') {
      Some(0) | None => file,
      Some(dot) => &file[..dot],
    }
  }

  /// Lower-cased extension including the leading dot, or `""` when there is none.
  pub fn extension(&self) -> String {
    let file = self.file_name();
    match file.rfind('.') {
      Some(0) | None => String::new(),
      Some(dot) => file[dot..].to_ascii_lowercase(),
    }
  }
}

impl std::fmt::Display for ImageRef {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}/{}", self.bucket, self.key)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn splits_key_into_name_parts() {
    let image = ImageRef::new("b", "uploads/2024/Holiday.Photo.JPG");
    assert_eq!(image.file_name(), "Holiday.Photo.JPG");
    assert_eq!(image.base_name(), "Holiday.Photo");
    assert_eq!(image.extension(), ".jpg");
  }

  #[test]
  fn dotfiles_and_bare_names_have_no_extension() {
    assert_eq!(ImageRef::new("b", "uploads/.hidden").extension(), "");
    assert_eq!(ImageRef::new("b", "uploads/README").extension(), "");
    assert_eq!(ImageRef::new("b", "README").base_name(), "README");
  }
}
