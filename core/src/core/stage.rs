// imgflow/src/core/stage.rs

//! Defines the static description of a single pipeline stage.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a stage within the graph. The role decides which edges are legal for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
  /// Ordinary unit of work. Needs a success edge; its error edge must target the failure handler.
  Work,
  /// Success notification. Ends the success chain; a failure here may only end in a fail terminal.
  Notify,
  /// The unique failure-notification stage. Both of its edges lead to a fail terminal.
  FailureHandler,
  /// Unconditional failed terminal. Has no adapter and no outgoing edges.
  Fail,
}

/// The two kinds of outgoing edges a stage can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
  Success,
  Error,
}

impl fmt::Display for EdgeKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      EdgeKind::Success => f.write_str("success"),
      EdgeKind::Error => f.write_str("error"),
    }
  }
}

/// Definition of a pipeline stage: its name, role, the adapter it invokes and its two edges.
///
/// `next == None` on a successful invocation ends the instance as `succeeded`.
/// `catch == None` on a failed invocation ends the instance as `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDefinition {
  pub name: String,
  pub kind: StageKind,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub adapter: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub next: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub catch: Option<String>,
}

impl StageDefinition {
  fn with_kind(name: impl Into<String>, kind: StageKind, adapter: Option<String>) -> Self {
    Self {
      name: name.into(),
      kind,
      adapter,
      next: None,
      catch: None,
    }
  }

  pub fn work(name: impl Into<String>, adapter: impl Into<String>) -> Self {
    Self::with_kind(name, StageKind::Work, Some(adapter.into()))
  }

  pub fn notify(name: impl Into<String>, adapter: impl Into<String>) -> Self {
    Self::with_kind(name, StageKind::Notify, Some(adapter.into()))
  }

  pub fn failure_handler(name: impl Into<String>, adapter: impl Into<String>) -> Self {
    Self::with_kind(name, StageKind::FailureHandler, Some(adapter.into()))
  }

  pub fn fail(name: impl Into<String>) -> Self {
    Self::with_kind(name, StageKind::Fail, None)
  }

  /// Sets the success edge.
  pub fn then(mut self, next: impl Into<String>) -> Self {
    self.next = Some(next.into());
    self
  }

  /// Sets the error edge.
  pub fn on_error(mut self, target: impl Into<String>) -> Self {
    self.catch = Some(target.into());
    self
  }

  pub fn edge(&self, edge: EdgeKind) -> Option<&str> {
    match edge {
      EdgeKind::Success => self.next.as_deref(),
      EdgeKind::Error => self.catch.as_deref(),
    }
  }

  pub fn is_fail_terminal(&self) -> bool {
    self.kind == StageKind::Fail
  }
}
