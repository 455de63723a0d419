// imgflow/src/status/store.rs

//! The `StatusStore` seam and the two stores shipped with the crate.

use crate::status::record::StatusRecord;
use anyhow::Context as _;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{event, Level};

/// Durable keyed storage of status records. Writes are last-writer-wins per key, with no merge.
#[async_trait]
pub trait StatusStore: Send + Sync {
  async fn put(&self, record: StatusRecord) -> anyhow::Result<()>;

  /// `Ok(None)` when no record exists for `image_key`; absence is not a fault.
  async fn get(&self, image_key: &str) -> anyhow::Result<Option<StatusRecord>>;
}

#[derive(Debug, Default)]
pub struct InMemoryStatusStore {
  records: RwLock<HashMap<String, StatusRecord>>,
}

impl InMemoryStatusStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.records.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.read().is_empty()
  }

  pub fn contains(&self, image_key: &str) -> bool {
    self.records.read().contains_key(image_key)
  }
}

#[async_trait]
impl StatusStore for InMemoryStatusStore {
  async fn put(&self, record: StatusRecord) -> anyhow::Result<()> {
    self.records.write().insert(record.image_key.clone(), record);
    Ok(())
  }

  async fn get(&self, image_key: &str) -> anyhow::Result<Option<StatusRecord>> {
    Ok(self.records.read().get(image_key).cloned())
  }
}

/// Keeps all records in one JSON document on disk.
///
/// The document is loaded on `open` and rewritten in full on every `put`, first to a sibling
/// temp file and then renamed over the original, so readers never see a half-written file.
#[derive(Debug)]
pub struct JsonFileStatusStore {
  path: PathBuf,
  records: Mutex<BTreeMap<String, StatusRecord>>,
}

impl JsonFileStatusStore {
  pub async fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
    let path = path.into();
    let records = match tokio::fs::read(&path).await {
      Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
      Ok(bytes) => serde_json::from_slice(&bytes)
        .with_context(|| format!("status store file {} is not a valid record document", path.display()))?,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
      Err(e) => {
        return Err(e).with_context(|| format!("failed to read status store file {}", path.display()));
      }
    };
    event!(Level::INFO, path = %path.display(), records = records.len(), "Status store opened.");
    Ok(Self {
      path,
      records: Mutex::new(records),
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn temp_path(&self) -> PathBuf {
    let mut name = self
      .path
      .file_name()
      .map(|n| n.to_os_string())
      .unwrap_or_else(|| "status".into());
    name.push(".tmp");
    self.path.with_file_name(name)
  }
}

#[async_trait]
impl StatusStore for JsonFileStatusStore {
  async fn put(&self, record: StatusRecord) -> anyhow::Result<()> {
    let mut records = self.records.lock().await;
    let key = record.image_key.clone();
    let previous = records.insert(key.clone(), record);

    let written = async {
      let document = serde_json::to_vec_pretty(&*records).context("failed to serialize status records")?;
      if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
          .await
          .with_context(|| format!("failed to create directory {}", parent.display()))?;
      }
      let temp = self.temp_path();
      tokio::fs::write(&temp, document)
        .await
        .with_context(|| format!("failed to write {}", temp.display()))?;
      tokio::fs::rename(&temp, &self.path)
        .await
        .with_context(|| format!("failed to replace {}", self.path.display()))?;
      anyhow::Ok(())
    }
    .await;

    if let Err(e) = written {
      // Keep memory consistent with what is on disk.
      match previous {
        Some(prev) => records.insert(key, prev),
        None => records.remove(&key),
      };
      return Err(e);
    }
    event!(Level::DEBUG, image_key = %key, "Status record written.");
    Ok(())
  }

  async fn get(&self, image_key: &str) -> anyhow::Result<Option<StatusRecord>> {
    Ok(self.records.lock().await.get(image_key).cloned())
  }
}
