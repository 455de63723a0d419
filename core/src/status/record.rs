// imgflow/src/status/record.rs

//! The durable, per-item snapshot written by the persist stage and served by status queries.

use crate::core::context::{ExecutionContext, Fields};
use crate::trigger::BUCKET_KEY;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Overall status written by a successful persist.
pub const STATUS_COMPLETED: &str = "COMPLETED";

/// One record per item key. A later write for the same key replaces the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
  #[serde(rename = "ImageKey")]
  pub image_key: String,
  #[serde(rename = "s3_bucket_original")]
  pub source_bucket: Option<String>,
  #[serde(rename = "s3_key_original")]
  pub original_key: Option<String>,
  pub image_type: Option<String>,
  pub validation_status: Option<String>,
  #[serde(default)]
  pub thumbnails: BTreeMap<String, String>,
  pub thumbnail_generation_status: Option<String>,
  #[serde(default)]
  pub extracted_metadata: Fields,
  pub metadata_extraction_status: Option<String>,
  pub overall_processing_status: String,
  /// Unix seconds.
  pub created_at: i64,
  pub updated_at: i64,
}

impl StatusRecord {
  /// Snapshots the fields accumulated by earlier stages.
  pub fn from_context(ctx: &ExecutionContext, now: DateTime<Utc>) -> Self {
    let text = |name: &str| ctx.field_str(name).map(str::to_string);
    let thumbnails = ctx
      .field("thumbnails")
      .and_then(Value::as_object)
      .map(|locations| {
        locations
          .iter()
          .filter_map(|(size, location)| location.as_str().map(|l| (size.clone(), l.to_string())))
          .collect()
      })
      .unwrap_or_default();
    let extracted_metadata = ctx
      .field("extracted_metadata")
      .and_then(Value::as_object)
      .cloned()
      .unwrap_or_default();
    let source_bucket = text("s3_bucket").or_else(|| {
      ctx
        .source_metadata()
        .get(BUCKET_KEY)
        .and_then(Value::as_str)
        .map(str::to_string)
    });
    let timestamp = now.timestamp();

    Self {
      image_key: ctx.item_key().to_string(),
      source_bucket,
      original_key: text("s3_key"),
      image_type: text("image_type"),
      validation_status: text("validation_status"),
      thumbnails,
      thumbnail_generation_status: text("thumbnail_generation_status"),
      extracted_metadata,
      metadata_extraction_status: text("metadata_extraction_status"),
      overall_processing_status: STATUS_COMPLETED.to_string(),
      created_at: timestamp,
      updated_at: timestamp,
    }
  }

  /// The record as a flat field mapping, the shape status queries return.
  pub fn to_value(&self) -> Value {
    serde_json::to_value(self).unwrap_or(Value::Null)
  }
}
