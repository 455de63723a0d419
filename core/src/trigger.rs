// imgflow/src/trigger.rs

//! Defines the `TriggerEvent` that starts a pipeline instance, and parsing of the JSON envelopes
//! an upload notification may arrive in.

use crate::core::context::Fields;
use crate::error::{FlowError, FlowResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata key under which the source bucket of a trigger is recorded.
pub const BUCKET_KEY: &str = "bucket";

/// An upload event: the item key plus whatever metadata the source attached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
  pub item_key: String,
  #[serde(default)]
  pub source_metadata: Fields,
}

impl TriggerEvent {
  pub fn new(item_key: impl Into<String>, source_metadata: Fields) -> Self {
    Self {
      item_key: item_key.into(),
      source_metadata,
    }
  }

  pub fn for_key(item_key: impl Into<String>) -> Self {
    Self::new(item_key, Fields::new())
  }

  pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
    self.source_metadata.insert(name.into(), value.into());
    self
  }

  pub fn bucket(&self) -> Option<&str> {
    self.source_metadata.get(BUCKET_KEY).and_then(Value::as_str)
  }

  /// Parses a trigger from either envelope:
  ///
  /// - storage notification: `{"Records": [{"s3": {"bucket": {"name": ..}, "object": {"key": ..}}}]}`
  /// - flat: `{"s3_bucket": .., "s3_key": ..}` or `{"item_key": .., "source_metadata": {..}}`
  ///
  /// Object keys in either shape are URL-unquoted with `+` meaning space.
  pub fn from_json(event: &Value) -> FlowResult<Self> {
    let obj = event
      .as_object()
      .ok_or_else(|| FlowError::invalid_trigger("trigger event must be a JSON object"))?;

    if let Some(record) = obj.get("Records").and_then(|r| r.get(0)) {
      let s3 = record.get("s3");
      let bucket = s3.and_then(|s| s.pointer("/bucket/name")).and_then(Value::as_str);
      let key = s3.and_then(|s| s.pointer("/object/key")).and_then(Value::as_str);
      if let Some(key) = key {
        let mut metadata = Fields::new();
        if let Some(bucket) = bucket {
          metadata.insert(BUCKET_KEY.into(), bucket.into());
        }
        if let Some(name) = record.get("eventName").and_then(Value::as_str) {
          metadata.insert("event_name".into(), name.into());
        }
        if let Some(size) = s3.and_then(|s| s.pointer("/object/size")).and_then(Value::as_u64) {
          metadata.insert("size_bytes".into(), size.into());
        }
        return Self::keyed(key, metadata);
      }
    }

    if let Some(key) = obj.get("s3_key").and_then(Value::as_str) {
      let mut metadata: Fields = obj
        .iter()
        .filter(|(name, _)| name.as_str() != "s3_key" && name.as_str() != "s3_bucket")
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
      if let Some(bucket) = obj.get("s3_bucket").and_then(Value::as_str) {
        metadata.insert(BUCKET_KEY.into(), bucket.into());
      }
      return Self::keyed(key, metadata);
    }

    if obj.contains_key("item_key") {
      let trigger: TriggerEvent = serde_json::from_value(event.clone())
        .map_err(|e| FlowError::invalid_trigger(format!("malformed trigger event: {}", e)))?;
      return Self::keyed(&trigger.item_key, trigger.source_metadata);
    }

    Err(FlowError::invalid_trigger("bucket name or object key not found in the event"))
  }

  fn keyed(raw_key: &str, source_metadata: Fields) -> FlowResult<Self> {
    let trigger = Self::new(unquote_plus(raw_key)?, source_metadata);
    trigger.resolve_key()?;
    Ok(trigger)
  }

  /// The key this trigger runs under. Empty or whitespace-only keys are rejected.
  pub(crate) fn resolve_key(&self) -> FlowResult<String> {
    if self.item_key.trim().is_empty() {
      return Err(FlowError::invalid_trigger("item key is empty"));
    }
    Ok(self.item_key.clone())
  }
}

/// URL-decodes an object key, treating `+` as an encoded space.
pub fn unquote_plus(raw: &str) -> FlowResult<String> {
  let spaced = raw.replace('+', " ");
  urlencoding::decode(&spaced)
    .map(|decoded| decoded.into_owned())
    .map_err(|e| FlowError::invalid_trigger(format!("object key '{}' is not valid URL encoding: {}", raw, e)))
}
