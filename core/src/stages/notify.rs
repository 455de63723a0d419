// imgflow/src/stages/notify.rs

use crate::core::adapter::TaskAdapter;
use crate::core::context::{ExecutionContext, Fields};
use crate::core::control::StageResult;
use crate::notify::{NotificationStatus, Notifier};
use async_trait::async_trait;

pub const DELIVERY_ERROR_KIND: &str = "DeliveryError";

/// Sends the success or failure notification for the instance.
#[derive(Debug, Clone)]
pub struct NotifyStage {
  notifier: Notifier,
  status: NotificationStatus,
}

impl NotifyStage {
  pub fn success(notifier: Notifier) -> Self {
    Self {
      notifier,
      status: NotificationStatus::Success,
    }
  }

  pub fn failure(notifier: Notifier) -> Self {
    Self {
      notifier,
      status: NotificationStatus::Failure,
    }
  }
}

#[async_trait]
impl TaskAdapter for NotifyStage {
  async fn invoke(&self, ctx: &ExecutionContext) -> StageResult {
    let delivered = match self.status {
      NotificationStatus::Success => self.notifier.notify_success(ctx).await,
      NotificationStatus::Failure => self.notifier.notify_failure(ctx).await,
    };
    match delivered {
      Ok(message_id) => {
        let mut output = Fields::new();
        output.insert("notification_id".into(), message_id.into());
        output.insert("notification_status".into(), "SENT".into());
        StageResult::success(output)
      }
      Err(e) => StageResult::failure(DELIVERY_ERROR_KIND, e.to_string()),
    }
  }
}
