// examples/image_pipeline.rs

//! Runs the standard image pipeline against in-memory collaborators, for one good upload and
//! one rejected upload, then queries the status of both.

use async_trait::async_trait;
use imgflow::stages::{ImageMetadata, ImageRef, MetadataExtractor, RenderedThumbnail, ThumbnailFormat, ThumbnailPlan, ThumbnailRenderer};
use imgflow::{
  ImagePipeline, InMemoryStatusStore, OutboxChannel, PipelineConfig, StatusQuery, StatusStoreAccessor, TriggerEvent,
};
use serde_json::json;
use std::sync::Arc;
use tracing::Level;

/// Pretends every source is a 1024x768 JPEG.
struct PretendImaging;

#[async_trait]
impl ThumbnailRenderer for PretendImaging {
  async fn render(&self, plan: &ThumbnailPlan) -> anyhow::Result<Vec<RenderedThumbnail>> {
    Ok(
      plan
        .sizes
        .iter()
        .map(|&size| RenderedThumbnail {
          size,
          key: plan.target_key(size, ThumbnailFormat::Jpeg),
        })
        .collect(),
    )
  }
}

#[async_trait]
impl MetadataExtractor for PretendImaging {
  async fn extract(&self, source: &ImageRef) -> anyhow::Result<ImageMetadata> {
    Ok(ImageMetadata {
      filename: source.file_name().to_string(),
      filesize_bytes: 184_320,
      format: "JPEG".into(),
      width_pixels: 1024,
      height_pixels: 768,
      mode: "RGB".into(),
    })
  }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt().with_max_level(Level::INFO).init();

  let imaging = Arc::new(PretendImaging);
  let store = Arc::new(InMemoryStatusStore::new());
  let outbox = Arc::new(OutboxChannel::new());

  let engine = ImagePipeline::builder(PipelineConfig::default())
    .thumbnail_renderer(imaging.clone())
    .metadata_extractor(imaging)
    .status_store(store.clone())
    .notification_channel(outbox.clone())
    .build()?;

  let good = TriggerEvent::from_json(&json!({
    "Records": [{"s3": {"bucket": {"name": "image-uploads"}, "object": {"key": "uploads/my+cat.jpg"}}}]
  }))?;
  let bad = TriggerEvent::for_key("uploads/notes.txt");

  for trigger in [good, bad] {
    let outcome = engine.run(trigger).await?;
    println!(
      "{} -> {:?} via {:?}",
      outcome.context.item_key(),
      outcome.status,
      outcome.context.visited_stages()
    );
    if let Some(error) = outcome.context.error() {
      println!("  failed at {}: {} ({})", error.stage, error.kind, error.message);
    }
  }

  for message in outbox.messages() {
    println!("notification: {}", message.subject);
  }

  let query = StatusQuery::new(StatusStoreAccessor::new(store));
  for key in ["uploads/my cat.jpg", "uploads/notes.txt"] {
    let response = query.respond(Some(key)).await;
    println!("status {} -> {} {}", key, response.status_code, response.body);
  }
  Ok(())
}
