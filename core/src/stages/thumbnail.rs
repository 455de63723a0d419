// imgflow/src/stages/thumbnail.rs

use crate::config::{PipelineConfig, ThumbnailSize};
use crate::core::adapter::TaskAdapter;
use crate::core::context::{ExecutionContext, Fields};
use crate::core::control::StageResult;
use crate::stages::{ImageRef, STAGE_SUCCESS};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{event, Level};

pub const THUMBNAIL_ERROR_KIND: &str = "ThumbnailError";

/// Output encoding for thumbnails. Sources in any other format are written as JPEG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThumbnailFormat {
  Jpeg,
  Png,
}

impl ThumbnailFormat {
  /// Picks the thumbnail format for a source format name such as `"PNG"` or `"jpeg"`.
  pub fn for_source(format_name: &str) -> Self {
    if format_name.eq_ignore_ascii_case("png") {
      ThumbnailFormat::Png
    } else {
      ThumbnailFormat::Jpeg
    }
  }

  pub fn extension(self) -> &'static str {
    match self {
      ThumbnailFormat::Jpeg => "jpeg",
      ThumbnailFormat::Png => "png",
    }
  }

  pub fn mime_type(self) -> &'static str {
    match self {
      ThumbnailFormat::Jpeg => "image/jpeg",
      ThumbnailFormat::Png => "image/png",
    }
  }
}

/// What a renderer is asked to produce for one source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailPlan {
  pub source: ImageRef,
  pub target_bucket: String,
  pub sizes: Vec<ThumbnailSize>,
}

impl ThumbnailPlan {
  /// Key a thumbnail of `size` is written under: `thumbnails/{base}_{w}x{h}.{ext}`.
  pub fn target_key(&self, size: ThumbnailSize, format: ThumbnailFormat) -> String {
    format!("thumbnails/{}_{}.{}", self.source.base_name(), size, format.extension())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedThumbnail {
  pub size: ThumbnailSize,
  pub key: String,
}

/// Loads a source image once and writes one aspect-preserving thumbnail per planned size.
#[async_trait]
pub trait ThumbnailRenderer: Send + Sync {
  async fn render(&self, plan: &ThumbnailPlan) -> anyhow::Result<Vec<RenderedThumbnail>>;
}

pub struct ThumbnailStage {
  config: Arc<PipelineConfig>,
  renderer: Arc<dyn ThumbnailRenderer>,
}

impl ThumbnailStage {
  pub fn new(config: Arc<PipelineConfig>, renderer: Arc<dyn ThumbnailRenderer>) -> Self {
    Self { config, renderer }
  }
}

#[async_trait]
impl TaskAdapter for ThumbnailStage {
  async fn invoke(&self, ctx: &ExecutionContext) -> StageResult {
    let plan = ThumbnailPlan {
      source: ImageRef::from_context(ctx, &self.config),
      target_bucket: self.config.thumbnails_bucket.clone(),
      sizes: self.config.thumbnail_sizes.clone(),
    };

    let rendered = match self.renderer.render(&plan).await {
      Ok(rendered) => rendered,
      Err(e) => return StageResult::failure(THUMBNAIL_ERROR_KIND, format!("Error generating thumbnails: {:#}", e)),
    };

    let mut locations = Fields::new();
    for thumb in &rendered {
      let location = format!("{}/{}", plan.target_bucket, thumb.key);
      event!(Level::DEBUG, size = %thumb.size, location = %location, "Thumbnail written.");
      locations.insert(thumb.size.to_string(), Value::String(location));
    }
    if let Some(missing) = plan.sizes.iter().find(|s| !locations.contains_key(&s.to_string())) {
      return StageResult::failure(
        THUMBNAIL_ERROR_KIND,
        format!("renderer produced no {} thumbnail for {}", missing, plan.source),
      );
    }

    let mut output = Fields::new();
    output.insert("thumbnails".into(), Value::Object(locations));
    output.insert("thumbnail_generation_status".into(), STAGE_SUCCESS.into());
    StageResult::success(output)
  }
}

impl std::fmt::Debug for ThumbnailStage {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ThumbnailStage").field("sizes", &self.config.thumbnail_sizes).finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  struct PlanEcho {
    skip_last: bool,
  }

  #[async_trait]
  impl ThumbnailRenderer for PlanEcho {
    async fn render(&self, plan: &ThumbnailPlan) -> anyhow::Result<Vec<RenderedThumbnail>> {
      let mut sizes = plan.sizes.clone();
      if self.skip_last {
        sizes.pop();
      }
      Ok(
        sizes
          .into_iter()
          .map(|size| RenderedThumbnail {
            size,
            key: plan.target_key(size, ThumbnailFormat::for_source("PNG")),
          })
          .collect(),
      )
    }
  }

  fn stage(skip_last: bool) -> ThumbnailStage {
    let config = PipelineConfig {
      thumbnails_bucket: "thumbs".into(),
      ..PipelineConfig::default()
    };
    ThumbnailStage::new(Arc::new(config), Arc::new(PlanEcho { skip_last }))
  }

  #[test]
  fn non_png_sources_become_jpeg() {
    assert_eq!(ThumbnailFormat::for_source("gif"), ThumbnailFormat::Jpeg);
    assert_eq!(ThumbnailFormat::for_source("Png"), ThumbnailFormat::Png);
  }

  #[tokio::test]
  async fn records_one_location_per_size() {
    let ctx = ExecutionContext::new("uploads/cat.png".into(), Fields::new(), "GenerateThumbnails");
    match stage(false).invoke(&ctx).await {
      StageResult::Success(fields) => {
        assert_eq!(
          fields["thumbnails"],
          json!({
            "128x128": "thumbs/thumbnails/cat_128x128.png",
            "256x256": "thumbs/thumbnails/cat_256x256.png"
          })
        );
        assert_eq!(fields["thumbnail_generation_status"], json!("SUCCESS"));
      }
      other => panic!("expected success, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn missing_size_is_a_failure() {
    let ctx = ExecutionContext::new("uploads/cat.png".into(), Fields::new(), "GenerateThumbnails");
    match stage(true).invoke(&ctx).await {
      StageResult::Failure(f) => {
        assert_eq!(f.kind, THUMBNAIL_ERROR_KIND);
        assert!(f.message.contains("256x256"));
      }
      other => panic!("expected failure, got {:?}", other),
    }
  }
}
