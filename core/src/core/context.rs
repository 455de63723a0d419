// imgflow/src/core/context.rs

//! The execution context: the accumulator threaded through every stage of one pipeline instance.

use crate::core::control::{StageFailure, StageResult};
use crate::error::{FlowError, FlowResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Field name -> value mapping produced by stages and merged into the context.
pub type Fields = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
  Pending,
  Succeeded,
  Failed,
}

impl TerminalStatus {
  pub fn is_terminal(self) -> bool {
    self != TerminalStatus::Pending
  }
}

/// Failure recorded on the context, tagged with the stage that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
  pub stage: String,
  pub kind: String,
  pub message: String,
}

/// One visited stage and what it returned, in visit order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageOutput {
  pub stage: String,
  pub result: StageResult,
}

/// Mutable accumulator for one pipeline instance.
///
/// Only the engine mutates it. Once `status` leaves `Pending` every mutation is refused.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionContext {
  execution_id: Uuid,
  item_key: String,
  source_metadata: Fields,
  current_stage: String,
  fields: Fields,
  trail: Vec<StageOutput>,
  status: TerminalStatus,
  error: Option<ErrorDetail>,
}

impl ExecutionContext {
  pub(crate) fn new(item_key: String, source_metadata: Fields, start_stage: &str) -> Self {
    Self {
      execution_id: Uuid::new_v4(),
      item_key,
      source_metadata,
      current_stage: start_stage.to_string(),
      fields: Fields::new(),
      trail: Vec::new(),
      status: TerminalStatus::Pending,
      error: None,
    }
  }

  pub fn execution_id(&self) -> Uuid {
    self.execution_id
  }

  pub fn item_key(&self) -> &str {
    &self.item_key
  }

  pub fn source_metadata(&self) -> &Fields {
    &self.source_metadata
  }

  pub fn current_stage(&self) -> &str {
    &self.current_stage
  }

  /// All stage output fields merged so far. A later stage overwrites an earlier field of the same name.
  pub fn fields(&self) -> &Fields {
    &self.fields
  }

  pub fn field(&self, name: &str) -> Option<&Value> {
    self.fields.get(name)
  }

  pub fn field_str(&self, name: &str) -> Option<&str> {
    self.fields.get(name).and_then(Value::as_str)
  }

  pub fn trail(&self) -> &[StageOutput] {
    &self.trail
  }

  /// Names of visited stages, in order.
  pub fn visited_stages(&self) -> Vec<&str> {
    self.trail.iter().map(|o| o.stage.as_str()).collect()
  }

  pub fn status(&self) -> TerminalStatus {
    self.status
  }

  pub fn error(&self) -> Option<&ErrorDetail> {
    self.error.as_ref()
  }

  fn ensure_pending(&self, action: &str) -> FlowResult<()> {
    if self.status.is_terminal() {
      return Err(FlowError::Internal(format!(
        "cannot {} on execution {} for '{}': context is already {:?}",
        action, self.execution_id, self.item_key, self.status
      )));
    }
    Ok(())
  }

  pub(crate) fn enter(&mut self, stage: &str) -> FlowResult<()> {
    self.ensure_pending("enter a stage")?;
    self.current_stage = stage.to_string();
    Ok(())
  }

  pub(crate) fn record_success(&mut self, stage: &str, output: Fields) -> FlowResult<()> {
    self.ensure_pending("apply stage output")?;
    for (name, value) in &output {
      self.fields.insert(name.clone(), value.clone());
    }
    self.trail.push(StageOutput {
      stage: stage.to_string(),
      result: StageResult::Success(output),
    });
    Ok(())
  }

  /// Records a failure. The first failure of an instance stays in `error`; later ones only reach the trail.
  pub(crate) fn record_failure(&mut self, stage: &str, failure: StageFailure) -> FlowResult<()> {
    self.ensure_pending("record a failure")?;
    if self.error.is_none() {
      self.error = Some(ErrorDetail {
        stage: stage.to_string(),
        kind: failure.kind.clone(),
        message: failure.message.clone(),
      });
    }
    self.trail.push(StageOutput {
      stage: stage.to_string(),
      result: StageResult::Failure(failure),
    });
    Ok(())
  }

  pub(crate) fn succeed(&mut self) -> FlowResult<()> {
    self.ensure_pending("finish")?;
    self.status = TerminalStatus::Succeeded;
    Ok(())
  }

  /// Ends the instance as failed. A context that reaches a fail terminal without a recorded
  /// failure gets a generic detail so `failed` always carries one.
  pub(crate) fn fail(&mut self, stage: &str, fallback: impl FnOnce() -> StageFailure) -> FlowResult<()> {
    self.ensure_pending("finish")?;
    if self.error.is_none() {
      let failure = fallback();
      self.error = Some(ErrorDetail {
        stage: stage.to_string(),
        kind: failure.kind,
        message: failure.message,
      });
    }
    self.status = TerminalStatus::Failed;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn fields(value: Value) -> Fields {
    value.as_object().cloned().unwrap()
  }

  #[test]
  fn later_output_overwrites_earlier_fields() {
    let mut ctx = ExecutionContext::new("uploads/cat.jpg".into(), Fields::new(), "A");
    ctx.record_success("A", fields(json!({"status": "one", "a": 1}))).unwrap();
    ctx.record_success("B", fields(json!({"status": "two"}))).unwrap();
    assert_eq!(ctx.field_str("status"), Some("two"));
    assert_eq!(ctx.field("a"), Some(&json!(1)));
    assert_eq!(ctx.visited_stages(), vec!["A", "B"]);
  }

  #[test]
  fn first_failure_is_kept_as_error_detail() {
    let mut ctx = ExecutionContext::new("k".into(), Fields::new(), "A");
    ctx.record_failure("A", StageFailure::new("InvalidFormat", "bad")).unwrap();
    ctx.record_failure("Notify", StageFailure::new("DeliveryError", "down")).unwrap();
    let err = ctx.error().unwrap();
    assert_eq!(err.stage, "A");
    assert_eq!(err.kind, "InvalidFormat");
    assert_eq!(ctx.trail().len(), 2);
  }

  #[test]
  fn terminal_context_refuses_mutation() {
    let mut ctx = ExecutionContext::new("k".into(), Fields::new(), "A");
    ctx.succeed().unwrap();
    assert!(ctx.record_success("B", Fields::new()).is_err());
    assert!(ctx.enter("B").is_err());
    assert!(ctx.fail("B", || StageFailure::new("x", "y")).is_err());
    assert_eq!(ctx.status(), TerminalStatus::Succeeded);
    assert!(ctx.error().is_none());
  }

  #[test]
  fn fail_without_recorded_failure_uses_fallback() {
    let mut ctx = ExecutionContext::new("k".into(), Fields::new(), "A");
    ctx
      .fail("Failed", || StageFailure::new("Failed", "reached fail terminal"))
      .unwrap();
    assert_eq!(ctx.status(), TerminalStatus::Failed);
    assert_eq!(ctx.error().unwrap().stage, "Failed");
  }
}
