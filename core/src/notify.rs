// imgflow/src/notify.rs

//! The `Notifier`: renders the fixed success and failure messages for an instance and hands
//! them to a `NotificationChannel`.

use crate::core::context::ExecutionContext;
use crate::error::{FlowError, FlowResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{event, Level};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationStatus {
  Success,
  Failure,
}

impl fmt::Display for NotificationStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      NotificationStatus::Success => write!(f, "SUCCESS"),
      NotificationStatus::Failure => write!(f, "FAILURE"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
  pub subject: String,
  pub body: String,
  pub status: NotificationStatus,
  pub item_key: String,
  pub topic: String,
}

/// Outbound transport for notifications. Returns the id the transport assigned to the message.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
  async fn deliver(&self, message: &NotificationMessage) -> anyhow::Result<String>;
}

#[derive(Clone)]
pub struct Notifier {
  channel: Arc<dyn NotificationChannel>,
  topic: String,
}

impl Notifier {
  pub fn new(channel: Arc<dyn NotificationChannel>, topic: impl Into<String>) -> Self {
    Self {
      channel,
      topic: topic.into(),
    }
  }

  pub fn topic(&self) -> &str {
    &self.topic
  }

  pub fn success_message(&self, ctx: &ExecutionContext) -> NotificationMessage {
    let key = ctx.item_key();
    let thumbnails = ctx
      .field("thumbnails")
      .and_then(|t| t.as_object())
      .map(|t| t.len())
      .unwrap_or(0);
    NotificationMessage {
      subject: format!("Image Processing {}: {}", NotificationStatus::Success, key),
      body: format!(
        "Image '{}' was processed successfully.\nThumbnails generated: {}\nExecution: {}",
        key,
        thumbnails,
        ctx.execution_id()
      ),
      status: NotificationStatus::Success,
      item_key: key.to_string(),
      topic: self.topic.clone(),
    }
  }

  pub fn failure_message(&self, ctx: &ExecutionContext) -> NotificationMessage {
    let key = ctx.item_key();
    let body = match ctx.error() {
      Some(err) => format!(
        "Processing of image '{}' failed at stage '{}'.\nError: {{kind: {}, message: {}}}\nExecution: {}",
        key,
        err.stage,
        err.kind,
        err.message,
        ctx.execution_id()
      ),
      None => format!(
        "Processing of image '{}' failed.\nExecution: {}",
        key,
        ctx.execution_id()
      ),
    };
    NotificationMessage {
      subject: format!("Image Processing {}: {}", NotificationStatus::Failure, key),
      body,
      status: NotificationStatus::Failure,
      item_key: key.to_string(),
      topic: self.topic.clone(),
    }
  }

  pub async fn notify_success(&self, ctx: &ExecutionContext) -> FlowResult<String> {
    self.send(self.success_message(ctx)).await
  }

  pub async fn notify_failure(&self, ctx: &ExecutionContext) -> FlowResult<String> {
    self.send(self.failure_message(ctx)).await
  }

  async fn send(&self, message: NotificationMessage) -> FlowResult<String> {
    match self.channel.deliver(&message).await {
      Ok(id) => {
        event!(Level::INFO, item_key = %message.item_key, status = %message.status, message_id = %id, "Notification delivered.");
        Ok(id)
      }
      Err(source) => {
        event!(Level::WARN, item_key = %message.item_key, status = %message.status, error = %source, "Notification delivery failed.");
        Err(FlowError::Delivery { source })
      }
    }
  }
}

impl fmt::Debug for Notifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Notifier").field("topic", &self.topic).finish_non_exhaustive()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboxEntry {
  pub message_id: String,
  pub message: NotificationMessage,
}

/// In-process channel that keeps the most recent deliveries and logs each one.
#[derive(Debug)]
pub struct OutboxChannel {
  capacity: usize,
  entries: Mutex<VecDeque<OutboxEntry>>,
}

impl OutboxChannel {
  pub const DEFAULT_CAPACITY: usize = 256;

  pub fn new() -> Self {
    Self::with_capacity(Self::DEFAULT_CAPACITY)
  }

  pub fn with_capacity(capacity: usize) -> Self {
    let capacity = capacity.max(1);
    Self {
      capacity,
      entries: Mutex::new(VecDeque::with_capacity(capacity.min(Self::DEFAULT_CAPACITY))),
    }
  }

  /// Delivered messages, oldest first.
  pub fn messages(&self) -> Vec<NotificationMessage> {
    self.entries.lock().iter().map(|e| e.message.clone()).collect()
  }

  pub fn entries(&self) -> Vec<OutboxEntry> {
    self.entries.lock().iter().cloned().collect()
  }

  pub fn len(&self) -> usize {
    self.entries.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.lock().is_empty()
  }
}

impl Default for OutboxChannel {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl NotificationChannel for OutboxChannel {
  async fn deliver(&self, message: &NotificationMessage) -> anyhow::Result<String> {
    let message_id = Uuid::new_v4().to_string();
    event!(
      Level::INFO,
      topic = %message.topic,
      subject = %message.subject,
      message_id = %message_id,
      "Publishing notification."
    );
    let mut entries = self.entries.lock();
    if entries.len() == self.capacity {
      entries.pop_front();
    }
    entries.push_back(OutboxEntry {
      message_id: message_id.clone(),
      message: message.clone(),
    });
    Ok(message_id)
  }
}
