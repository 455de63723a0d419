// imgflow/src/core/control.rs

//! Defines the result signal a stage returns and the outcome of a full pipeline run.

use crate::core::context::{ExecutionContext, Fields, TerminalStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure shape returned by a task adapter. The engine never looks at `kind` to decide routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind}: {message}")]
pub struct StageFailure {
  pub kind: String,
  pub message: String,
}

impl StageFailure {
  pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      kind: kind.into(),
      message: message.into(),
    }
  }

  /// Flattens an error chain into a failure of the given kind.
  pub fn from_error(kind: impl Into<String>, err: &anyhow::Error) -> Self {
    Self::new(kind, format!("{:#}", err))
  }
}

/// Signal from a task adapter: output fields to merge, or a failure to route along the error edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageResult {
  Success(Fields),
  Failure(StageFailure),
}

impl StageResult {
  pub fn success(fields: Fields) -> Self {
    StageResult::Success(fields)
  }

  pub fn failure(kind: impl Into<String>, message: impl Into<String>) -> Self {
    StageResult::Failure(StageFailure::new(kind, message))
  }

  /// Converts a collaborator result, tagging any error with `kind`.
  pub fn from_anyhow(kind: &str, result: anyhow::Result<Fields>) -> Self {
    match result {
      Ok(fields) => StageResult::Success(fields),
      Err(err) => StageResult::Failure(StageFailure::from_error(kind, &err)),
    }
  }

  pub fn is_success(&self) -> bool {
    matches!(self, StageResult::Success(_))
  }
}

/// Outcome of one pipeline instance. `run` reports every reachable outcome through this type.
#[derive(Debug, Clone)]
pub struct TerminalOutcome {
  pub status: TerminalStatus,
  pub context: ExecutionContext,
}

impl TerminalOutcome {
  pub fn is_succeeded(&self) -> bool {
    self.status == TerminalStatus::Succeeded
  }

  pub fn is_failed(&self) -> bool {
    self.status == TerminalStatus::Failed
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use anyhow::Context;

  #[test]
  fn from_anyhow_keeps_error_chain() {
    let err: anyhow::Result<Fields> = Err(anyhow::anyhow!("bucket unreachable")).context("reading source image");
    match StageResult::from_anyhow("ThumbnailError", err) {
      StageResult::Failure(f) => {
        assert_eq!(f.kind, "ThumbnailError");
        assert_eq!(f.message, "reading source image: bucket unreachable");
      }
      other => panic!("expected failure, got {:?}", other),
    }
  }
}
