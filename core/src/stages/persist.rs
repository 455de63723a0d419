// imgflow/src/stages/persist.rs

use crate::core::adapter::TaskAdapter;
use crate::core::context::{ExecutionContext, Fields};
use crate::core::control::StageResult;
use crate::stages::STAGE_SUCCESS;
use crate::status::record::{StatusRecord, STATUS_COMPLETED};
use crate::status::store::StatusStore;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{event, Level};

pub const STORAGE_ERROR_KIND: &str = "StorageError";

/// Writes the accumulated results as the item's status record.
pub struct PersistStage {
  store: Arc<dyn StatusStore>,
}

impl PersistStage {
  pub fn new(store: Arc<dyn StatusStore>) -> Self {
    Self { store }
  }
}

#[async_trait]
impl TaskAdapter for PersistStage {
  async fn invoke(&self, ctx: &ExecutionContext) -> StageResult {
    let record = StatusRecord::from_context(ctx, Utc::now());
    if let Err(e) = self.store.put(record).await {
      return StageResult::failure(
        STORAGE_ERROR_KIND,
        format!("Error storing results for '{}': {:#}", ctx.item_key(), e),
      );
    }
    event!(Level::INFO, item_key = %ctx.item_key(), "Status record stored.");

    let mut output = Fields::new();
    output.insert("storage_status".into(), STAGE_SUCCESS.into());
    output.insert("overall_processing_status".into(), STATUS_COMPLETED.into());
    StageResult::success(output)
  }
}

impl std::fmt::Debug for PersistStage {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PersistStage").finish_non_exhaustive()
  }
}
