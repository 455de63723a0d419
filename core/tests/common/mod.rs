// tests/common/mod.rs
#![allow(dead_code)] // Not every test binary uses every helper.

use async_trait::async_trait;
use imgflow::stages::{ImageMetadata, ImageRef, MetadataExtractor, RenderedThumbnail, ThumbnailFormat, ThumbnailPlan, ThumbnailRenderer};
use imgflow::{
  Engine, ImagePipeline, InMemoryStatusStore, NotificationChannel, NotificationMessage, NotificationStatus,
  PipelineConfig, StatusRecord, StatusStore,
};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use tracing::Level;

// --- Helper for Tracing Setup ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Invocation counters shared by closure adapters (tests using them run #[serial]) ---
pub static ADAPTER_CALLS: Lazy<Mutex<HashMap<String, usize>>> = Lazy::new(|| Mutex::new(HashMap::new()));

pub fn record_call(adapter: &str) {
  *ADAPTER_CALLS.lock().entry(adapter.to_string()).or_insert(0) += 1;
}

pub fn calls_to(adapter: &str) -> usize {
  ADAPTER_CALLS.lock().get(adapter).copied().unwrap_or(0)
}

pub fn reset_calls() {
  ADAPTER_CALLS.lock().clear();
}

// --- Fake collaborators ---

#[derive(Default)]
pub struct FakeRenderer {
  pub fail: bool,
  pub calls: AtomicUsize,
}

#[async_trait]
impl ThumbnailRenderer for FakeRenderer {
  async fn render(&self, plan: &ThumbnailPlan) -> anyhow::Result<Vec<RenderedThumbnail>> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.fail {
      anyhow::bail!("cannot identify image file '{}'", plan.source.key);
    }
    let format = ThumbnailFormat::for_source(plan.source.extension().trim_start_matches('.'));
    Ok(
      plan
        .sizes
        .iter()
        .map(|&size| RenderedThumbnail {
          size,
          key: plan.target_key(size, format),
        })
        .collect(),
    )
  }
}

#[derive(Default)]
pub struct FakeExtractor {
  pub fail: bool,
  pub calls: AtomicUsize,
}

#[async_trait]
impl MetadataExtractor for FakeExtractor {
  async fn extract(&self, source: &ImageRef) -> anyhow::Result<ImageMetadata> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.fail {
      anyhow::bail!("truncated image data");
    }
    Ok(ImageMetadata {
      filename: source.file_name().to_string(),
      filesize_bytes: 4096,
      format: "JPEG".into(),
      width_pixels: 800,
      height_pixels: 600,
      mode: "RGB".into(),
    })
  }
}

/// In-memory store whose reads or writes can be made to fail.
#[derive(Default)]
pub struct ScriptedStore {
  pub inner: InMemoryStatusStore,
  pub fail_put: bool,
  pub fail_get: bool,
  pub puts: AtomicUsize,
}

#[async_trait]
impl StatusStore for ScriptedStore {
  async fn put(&self, record: StatusRecord) -> anyhow::Result<()> {
    self.puts.fetch_add(1, Ordering::SeqCst);
    if self.fail_put {
      anyhow::bail!("provisioned throughput exceeded");
    }
    self.inner.put(record).await
  }

  async fn get(&self, image_key: &str) -> anyhow::Result<Option<StatusRecord>> {
    if self.fail_get {
      anyhow::bail!("store unavailable");
    }
    self.inner.get(image_key).await
  }
}

/// Records every delivery attempt; can reject one or both notification kinds.
#[derive(Default)]
pub struct RecordingChannel {
  pub fail_success: bool,
  pub fail_failure: bool,
  pub attempts: Mutex<Vec<NotificationMessage>>,
}

impl RecordingChannel {
  pub fn attempts(&self) -> Vec<NotificationMessage> {
    self.attempts.lock().clone()
  }

  pub fn attempts_with(&self, status: NotificationStatus) -> usize {
    self.attempts.lock().iter().filter(|m| m.status == status).count()
  }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
  async fn deliver(&self, message: &NotificationMessage) -> anyhow::Result<String> {
    let attempt = {
      let mut attempts = self.attempts.lock();
      attempts.push(message.clone());
      attempts.len()
    };
    let reject = match message.status {
      NotificationStatus::Success => self.fail_success,
      NotificationStatus::Failure => self.fail_failure,
    };
    if reject {
      anyhow::bail!("notification topic unreachable");
    }
    Ok(format!("msg-{}", attempt))
  }
}

// --- Standard pipeline harness ---

#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
  pub thumbnails: bool,
  pub extraction: bool,
  pub persist: bool,
  pub notify_success: bool,
  pub notify_failure: bool,
}

pub struct Harness {
  pub engine: Arc<Engine>,
  pub renderer: Arc<FakeRenderer>,
  pub extractor: Arc<FakeExtractor>,
  pub store: Arc<ScriptedStore>,
  pub channel: Arc<RecordingChannel>,
}

pub fn test_config() -> PipelineConfig {
  PipelineConfig {
    source_bucket: "test-uploads".into(),
    thumbnails_bucket: "test-thumbnails".into(),
    notification_topic: "test-topic".into(),
    ..PipelineConfig::default()
  }
}

pub fn harness(faults: Faults) -> Harness {
  let renderer = Arc::new(FakeRenderer {
    fail: faults.thumbnails,
    ..FakeRenderer::default()
  });
  let extractor = Arc::new(FakeExtractor {
    fail: faults.extraction,
    ..FakeExtractor::default()
  });
  let store = Arc::new(ScriptedStore {
    fail_put: faults.persist,
    ..ScriptedStore::default()
  });
  let channel = Arc::new(RecordingChannel {
    fail_success: faults.notify_success,
    fail_failure: faults.notify_failure,
    ..RecordingChannel::default()
  });

  let engine = ImagePipeline::builder(test_config())
    .thumbnail_renderer(renderer.clone())
    .metadata_extractor(extractor.clone())
    .status_store(store.clone())
    .notification_channel(channel.clone())
    .build()
    .expect("standard pipeline should build");

  Harness {
    engine: Arc::new(engine),
    renderer,
    extractor,
    store,
    channel,
  }
}
