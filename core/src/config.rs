// imgflow/src/config.rs

//! Process-wide pipeline configuration. Constructed once at start-up and injected into the
//! adapters that need it; nothing reads the environment at invocation time.

use crate::error::{FlowError, FlowResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThumbnailSize {
  pub width: u32,
  pub height: u32,
}

impl ThumbnailSize {
  pub const fn new(width: u32, height: u32) -> Self {
    Self { width, height }
  }

  /// Parses a comma-separated list such as `"100x100,640x480"`. Malformed entries are skipped
  /// with a warning.
  pub fn parse_list(raw: &str) -> Vec<ThumbnailSize> {
    raw
      .split(',')
      .map(str::trim)
      .filter(|entry| !entry.is_empty())
      .filter_map(|entry| match entry.parse::<ThumbnailSize>() {
        Ok(size) => Some(size),
        Err(e) => {
          warn!(entry, error = %e, "Skipping invalid thumbnail size.");
          None
        }
      })
      .collect()
  }
}

impl FromStr for ThumbnailSize {
  type Err = FlowError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || FlowError::config(format!("invalid thumbnail size '{}', expected WIDTHxHEIGHT", s));
    let (w, h) = s.trim().split_once(|c: char| c == 'x' || c == 'X').ok_or_else(invalid)?;
    let width: u32 = w.trim().parse().map_err(|_| invalid())?;
    let height: u32 = h.trim().parse().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
      return Err(invalid());
    }
    Ok(Self { width, height })
  }
}

impl fmt::Display for ThumbnailSize {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}x{}", self.width, self.height)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  /// Bucket recorded for items whose trigger did not name one.
  pub source_bucket: String,
  pub thumbnails_bucket: String,
  pub thumbnail_sizes: Vec<ThumbnailSize>,
  /// Lower-case extensions including the leading dot.
  pub supported_extensions: Vec<String>,
  pub status_table: String,
  pub notification_topic: String,
  pub detect_labels: bool,
  pub max_labels: usize,
  pub min_label_confidence: f32,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      source_bucket: "image-uploads".to_string(),
      thumbnails_bucket: "processed-thumbnails".to_string(),
      thumbnail_sizes: vec![ThumbnailSize::new(128, 128), ThumbnailSize::new(256, 256)],
      supported_extensions: vec![".jpg".to_string(), ".jpeg".to_string(), ".png".to_string()],
      status_table: "image-processing-status".to_string(),
      notification_topic: "image-processing-notifications".to_string(),
      detect_labels: false,
      max_labels: 10,
      min_label_confidence: 75.0,
    }
  }
}

impl PipelineConfig {
  pub fn validate(&self) -> FlowResult<()> {
    if self.thumbnails_bucket.trim().is_empty() {
      return Err(FlowError::config("thumbnails bucket is not configured"));
    }
    if self.thumbnail_sizes.is_empty() {
      return Err(FlowError::config("at least one thumbnail size is required"));
    }
    if self.supported_extensions.is_empty() {
      return Err(FlowError::config("no supported image extensions configured"));
    }
    if let Some(bad) = self.supported_extensions.iter().find(|e| !e.starts_with('.')) {
      return Err(FlowError::config(format!(
        "supported extension '{}' must start with '.'",
        bad
      )));
    }
    if !(0.0..=100.0).contains(&self.min_label_confidence) {
      return Err(FlowError::config(format!(
        "min label confidence {} is outside 0..=100",
        self.min_label_confidence
      )));
    }
    Ok(())
  }

  pub fn is_supported_extension(&self, extension: &str) -> bool {
    self
      .supported_extensions
      .iter()
      .any(|e| e.eq_ignore_ascii_case(extension))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_list_skips_malformed_entries() {
    let sizes = ThumbnailSize::parse_list("100x100, 640X480,banana,0x10,,32x");
    assert_eq!(sizes, vec![ThumbnailSize::new(100, 100), ThumbnailSize::new(640, 480)]);
  }

  #[test]
  fn display_round_trips_label() {
    assert_eq!(ThumbnailSize::new(128, 64).to_string(), "128x64");
  }

  #[test]
  fn default_config_is_valid() {
    let config = PipelineConfig::default();
    config.validate().unwrap();
    assert!(config.is_supported_extension(".JPG"));
    assert!(!config.is_supported_extension(".gif"));
  }

  #[test]
  fn validate_rejects_bad_values() {
    let mut config = PipelineConfig::default();
    config.thumbnail_sizes.clear();
    assert!(config.validate().is_err());

    let mut config = PipelineConfig::default();
    config.supported_extensions = vec!["png".into()];
    assert!(config.validate().is_err());

    let mut config = PipelineConfig::default();
    config.min_label_confidence = 140.0;
    assert!(config.validate().is_err());
  }

  #[test]
  fn partial_config_fills_defaults() {
    let config: PipelineConfig = serde_json::from_str(r#"{"thumbnails_bucket": "thumbs"}"#).unwrap();
    assert_eq!(config.thumbnails_bucket, "thumbs");
    assert_eq!(config.thumbnail_sizes.len(), 2);
  }
}
