// imgflow/src/stages/metadata.rs

use crate::config::PipelineConfig;
use crate::core::adapter::TaskAdapter;
use crate::core::context::{ExecutionContext, Fields};
use crate::core::control::StageResult;
use crate::stages::{ImageRef, STAGE_SUCCESS};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{event, Level};

pub const EXTRACTION_ERROR_KIND: &str = "ExtractionError";

/// Basic properties read from the decoded source image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
  pub filename: String,
  pub filesize_bytes: u64,
  /// Upper-case format name, e.g. `"JPEG"`.
  pub format: String,
  pub width_pixels: u32,
  pub height_pixels: u32,
  /// Pixel layout, e.g. `"RGB"` or `"RGBA"`.
  pub mode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedLabel {
  #[serde(rename = "Name")]
  pub name: String,
  #[serde(rename = "Confidence")]
  pub confidence: f32,
}

#[async_trait]
pub trait MetadataExtractor: Send + Sync {
  async fn extract(&self, source: &ImageRef) -> anyhow::Result<ImageMetadata>;
}

/// Optional content-label detection.
#[async_trait]
pub trait LabelDetector: Send + Sync {
  async fn detect(&self, source: &ImageRef, max_labels: usize, min_confidence: f32) -> anyhow::Result<Vec<DetectedLabel>>;
}

pub struct ExtractMetadataStage {
  config: Arc<PipelineConfig>,
  extractor: Arc<dyn MetadataExtractor>,
  labels: Option<Arc<dyn LabelDetector>>,
}

impl ExtractMetadataStage {
  pub fn new(config: Arc<PipelineConfig>, extractor: Arc<dyn MetadataExtractor>) -> Self {
    Self {
      config,
      extractor,
      labels: None,
    }
  }

  /// Labels are only requested when `detect_labels` is also set in the config.
  pub fn with_label_detector(mut self, detector: Arc<dyn LabelDetector>) -> Self {
    self.labels = Some(detector);
    self
  }

  async fn collect(&self, source: &ImageRef) -> anyhow::Result<Fields> {
    let metadata = self.extractor.extract(source).await?;
    let mut fields = match serde_json::to_value(&metadata)? {
      Value::Object(fields) => fields,
      other => anyhow::bail!("metadata serialized to a non-object value: {}", other),
    };

    if let (true, Some(detector)) = (self.config.detect_labels, self.labels.as_ref()) {
      match detector
        .detect(source, self.config.max_labels, self.config.min_label_confidence)
        .await
      {
        Ok(labels) => {
          fields.insert("labels".into(), serde_json::to_value(labels)?);
        }
        // A label service fault is recorded but does not fail extraction.
        Err(e) => {
          event!(Level::WARN, image = %source, error = %e, "Label detection failed.");
          fields.insert("label_error".into(), Value::String(format!("{:#}", e)));
        }
      }
    }
    Ok(fields)
  }
}

#[async_trait]
impl TaskAdapter for ExtractMetadataStage {
  async fn invoke(&self, ctx: &ExecutionContext) -> StageResult {
    let source = ImageRef::from_context(ctx, &self.config);
    match self.collect(&source).await {
      Ok(metadata) => {
        let mut output = Fields::new();
        output.insert("extracted_metadata".into(), Value::Object(metadata));
        output.insert("metadata_extraction_status".into(), STAGE_SUCCESS.into());
        StageResult::success(output)
      }
      Err(e) => StageResult::failure(EXTRACTION_ERROR_KIND, format!("Error extracting metadata: {:#}", e)),
    }
  }
}

impl std::fmt::Debug for ExtractMetadataStage {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ExtractMetadataStage")
      .field("detect_labels", &self.config.detect_labels)
      .field("has_label_detector", &self.labels.is_some())
      .finish()
  }
}
