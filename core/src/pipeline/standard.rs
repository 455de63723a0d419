// imgflow/src/pipeline/standard.rs

//! The standard image-processing pipeline and a builder that wires its adapters.

use crate::config::PipelineConfig;
use crate::core::stage::StageDefinition;
use crate::error::{FlowError, FlowResult, GraphConfigError};
use crate::notify::{NotificationChannel, Notifier};
use crate::pipeline::definition::PipelineDefinition;
use crate::pipeline::execution::Engine;
use crate::registry::AdapterRegistry;
use crate::stages::{
  names, ExtractMetadataStage, LabelDetector, MetadataExtractor, NotifyStage, PersistStage, ThumbnailRenderer,
  ThumbnailStage, ValidateStage,
};
use crate::status::store::StatusStore;
use std::sync::Arc;
use tracing::{event, Level};

pub const VALIDATE_IMAGE: &str = "ValidateImage";
pub const GENERATE_THUMBNAILS: &str = "GenerateThumbnails";
pub const EXTRACT_METADATA: &str = "ExtractMetadata";
pub const STORE_RESULTS: &str = "StoreResults";
pub const NOTIFY_SUCCESS: &str = "NotifySuccess";
pub const NOTIFY_FAILURE: &str = "NotifyFailure";
pub const PROCESSING_FAILED: &str = "ProcessingFailed";

/// `ValidateImage -> GenerateThumbnails -> ExtractMetadata -> StoreResults -> NotifySuccess`.
///
/// Every work stage's error edge leads to `NotifyFailure`. `NotifySuccess` errors and both
/// edges of `NotifyFailure` end in the `ProcessingFailed` terminal.
pub fn standard_pipeline() -> Result<PipelineDefinition, GraphConfigError> {
  PipelineDefinition::builder(VALIDATE_IMAGE)
    .stage(StageDefinition::work(VALIDATE_IMAGE, names::VALIDATE).then(GENERATE_THUMBNAILS).on_error(NOTIFY_FAILURE))
    .stage(StageDefinition::work(GENERATE_THUMBNAILS, names::THUMBNAIL).then(EXTRACT_METADATA).on_error(NOTIFY_FAILURE))
    .stage(StageDefinition::work(EXTRACT_METADATA, names::EXTRACT_METADATA).then(STORE_RESULTS).on_error(NOTIFY_FAILURE))
    .stage(StageDefinition::work(STORE_RESULTS, names::PERSIST).then(NOTIFY_SUCCESS).on_error(NOTIFY_FAILURE))
    .stage(StageDefinition::notify(NOTIFY_SUCCESS, names::NOTIFY_SUCCESS).on_error(PROCESSING_FAILED))
    .stage(
      StageDefinition::failure_handler(NOTIFY_FAILURE, names::NOTIFY_FAILURE)
        .then(PROCESSING_FAILED)
        .on_error(PROCESSING_FAILED),
    )
    .stage(StageDefinition::fail(PROCESSING_FAILED))
    .build()
}

/// Entry point for assembling the standard pipeline from its collaborators.
#[derive(Debug)]
pub struct ImagePipeline;

impl ImagePipeline {
  pub fn builder(config: PipelineConfig) -> ImagePipelineBuilder {
    ImagePipelineBuilder {
      config,
      renderer: None,
      extractor: None,
      label_detector: None,
      status_store: None,
      channel: None,
    }
  }
}

pub struct ImagePipelineBuilder {
  config: PipelineConfig,
  renderer: Option<Arc<dyn ThumbnailRenderer>>,
  extractor: Option<Arc<dyn MetadataExtractor>>,
  label_detector: Option<Arc<dyn LabelDetector>>,
  status_store: Option<Arc<dyn StatusStore>>,
  channel: Option<Arc<dyn NotificationChannel>>,
}

impl ImagePipelineBuilder {
  pub fn thumbnail_renderer(mut self, renderer: Arc<dyn ThumbnailRenderer>) -> Self {
    self.renderer = Some(renderer);
    self
  }

  pub fn metadata_extractor(mut self, extractor: Arc<dyn MetadataExtractor>) -> Self {
    self.extractor = Some(extractor);
    self
  }

  pub fn label_detector(mut self, detector: Arc<dyn LabelDetector>) -> Self {
    self.label_detector = Some(detector);
    self
  }

  pub fn status_store(mut self, store: Arc<dyn StatusStore>) -> Self {
    self.status_store = Some(store);
    self
  }

  pub fn notification_channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
    self.channel = Some(channel);
    self
  }

  /// Registers the six built-in adapters under their standard names.
  pub fn build_registry(self) -> FlowResult<AdapterRegistry> {
    self.config.validate()?;
    let missing = |what: &str| FlowError::config(format!("image pipeline requires a {}", what));
    let renderer = self.renderer.ok_or_else(|| missing("thumbnail renderer"))?;
    let extractor = self.extractor.ok_or_else(|| missing("metadata extractor"))?;
    let store = self.status_store.ok_or_else(|| missing("status store"))?;
    let channel = self.channel.ok_or_else(|| missing("notification channel"))?;

    if self.config.detect_labels && self.label_detector.is_none() {
      event!(Level::WARN, "Label detection is enabled but no label detector was supplied; labels will be skipped.");
    }

    let config = Arc::new(self.config);
    let notifier = Notifier::new(channel, config.notification_topic.clone());
    let mut extract = ExtractMetadataStage::new(config.clone(), extractor);
    if let Some(detector) = self.label_detector {
      extract = extract.with_label_detector(detector);
    }

    let mut registry = AdapterRegistry::new();
    registry
      .register(names::VALIDATE, ValidateStage::new(config.clone()))
      .register(names::THUMBNAIL, ThumbnailStage::new(config.clone(), renderer))
      .register(names::EXTRACT_METADATA, extract)
      .register(names::PERSIST, PersistStage::new(store))
      .register(names::NOTIFY_SUCCESS, NotifyStage::success(notifier.clone()))
      .register(names::NOTIFY_FAILURE, NotifyStage::failure(notifier));
    Ok(registry)
  }

  /// Builds an engine over `standard_pipeline()`.
  pub fn build(self) -> FlowResult<Engine> {
    let registry = self.build_registry()?;
    Engine::new(standard_pipeline()?, &registry)
  }
}

impl std::fmt::Debug for ImagePipelineBuilder {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ImagePipelineBuilder")
      .field("config", &self.config)
      .field("renderer", &self.renderer.is_some())
      .field("extractor", &self.extractor.is_some())
      .field("label_detector", &self.label_detector.is_some())
      .field("status_store", &self.status_store.is_some())
      .field("channel", &self.channel.is_some())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::stage::StageKind;

  #[test]
  fn standard_pipeline_shape() {
    let def = standard_pipeline().unwrap();
    assert_eq!(def.start_stage().name, VALIDATE_IMAGE);
    assert_eq!(def.failure_handler().name, NOTIFY_FAILURE);
    assert_eq!(def.len(), 7);
    for stage in def.stages().filter(|s| s.kind == StageKind::Work) {
      assert_eq!(stage.catch.as_deref(), Some(NOTIFY_FAILURE), "stage {}", stage.name);
    }
    let notify = def.stage_at(NOTIFY_SUCCESS).unwrap();
    assert!(notify.next.is_none());
    assert_eq!(notify.catch.as_deref(), Some(PROCESSING_FAILED));
  }

  #[test]
  fn builder_requires_collaborators() {
    match ImagePipeline::builder(PipelineConfig::default()).build() {
      Err(FlowError::Config { message }) => assert!(message.contains("thumbnail renderer")),
      other => panic!("expected Config error, got {:?}", other),
    }
  }
}
