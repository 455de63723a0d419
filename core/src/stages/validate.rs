// imgflow/src/stages/validate.rs

use crate::config::PipelineConfig;
use crate::core::adapter::TaskAdapter;
use crate::core::context::{ExecutionContext, Fields};
use crate::core::control::StageResult;
use crate::stages::{ImageRef, STAGE_SUCCESS};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{event, Level};

pub const INVALID_FORMAT_KIND: &str = "InvalidFormat";

/// Accepts the item only when its key carries one of the configured extensions.
#[derive(Debug, Clone)]
pub struct ValidateStage {
  config: Arc<PipelineConfig>,
}

impl ValidateStage {
  pub fn new(config: Arc<PipelineConfig>) -> Self {
    Self { config }
  }
}

#[async_trait]
impl TaskAdapter for ValidateStage {
  async fn invoke(&self, ctx: &ExecutionContext) -> StageResult {
    let image = ImageRef::from_context(ctx, &self.config);
    let extension = image.extension();

    if !self.config.is_supported_extension(&extension) {
      event!(Level::INFO, image = %image, extension = %extension, "Image type is not supported.");
      return StageResult::failure(
        INVALID_FORMAT_KIND,
        format!(
          "Unsupported image type: {}. Supported types are: {}",
          extension,
          self.config.supported_extensions.join(", ")
        ),
      );
    }

    let mut output = Fields::new();
    output.insert("s3_bucket".into(), image.bucket.into());
    output.insert("s3_key".into(), image.key.into());
    output.insert("image_type".into(), extension.into());
    output.insert("validation_status".into(), STAGE_SUCCESS.into());
    StageResult::success(output)
  }
}
