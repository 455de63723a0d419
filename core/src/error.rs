// imgflow/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

use crate::core::stage::EdgeKind;

#[derive(Debug, Error)]
pub enum FlowError {
  /// The trigger did not resolve to a usable item key. No context exists for it.
  #[error("Invalid trigger: {reason}")]
  InvalidTrigger { reason: String },

  #[error("Pipeline graph configuration error: {0}")]
  GraphConfiguration(#[from] GraphConfigError),

  #[error("Stage not found: {stage_name}")]
  StageNotFound { stage_name: String },

  #[error("No adapter '{adapter}' registered for stage '{stage_name}'")]
  AdapterMissing { stage_name: String, adapter: String },

  #[error("Configuration error: {message}")]
  Config { message: String },

  #[error("Status store error. Source: {source}")]
  Store {
    #[source]
    source: AnyhowError,
  },

  #[error("Notification delivery error. Source: {source}")]
  Delivery {
    #[source]
    source: AnyhowError,
  },

  #[error("Internal imgflow error: {0}")]
  Internal(String),
}

impl FlowError {
  pub fn invalid_trigger(reason: impl Into<String>) -> Self {
    FlowError::InvalidTrigger { reason: reason.into() }
  }

  pub fn config(message: impl Into<String>) -> Self {
    FlowError::Config {
      message: message.into(),
    }
  }
}

/// Load-time problems with a pipeline graph. Any of these prevents an engine from being built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphConfigError {
  #[error("pipeline definition has no stages")]
  Empty,

  #[error("stage '{0}' is defined more than once")]
  DuplicateStage(String),

  #[error("start stage '{0}' is not defined")]
  MissingStart(String),

  #[error("start stage '{0}' is a fail terminal")]
  StartIsTerminal(String),

  #[error("stage '{stage}' has a {edge} edge to undefined stage '{target}'")]
  DanglingEdge {
    stage: String,
    edge: EdgeKind,
    target: String,
  },

  #[error("work stage '{0}' has no error edge")]
  MissingErrorEdge(String),

  #[error("work stage '{0}' has no success edge; only a notification stage may end the success chain")]
  MissingSuccessEdge(String),

  #[error("notification stage '{0}' must end the success chain but has a success edge")]
  NotificationContinues(String),

  #[error("error edge of '{stage}' targets '{target}' instead of failure handler '{handler}'")]
  MisroutedErrorEdge {
    stage: String,
    target: String,
    handler: String,
  },

  #[error("more than one failure handler: '{first}' and '{second}'")]
  DuplicateFailureHandler { first: String, second: String },

  #[error("no failure handler stage is defined")]
  MissingFailureHandler,

  #[error("stage '{stage}' must route its {edge} edge to a fail terminal")]
  ExpectedFailTerminal { stage: String, edge: EdgeKind },

  #[error("fail terminal '{0}' must not carry an adapter or outgoing edges")]
  InvalidFailTerminal(String),

  #[error("stage '{0}' has no adapter")]
  MissingAdapter(String),

  #[error("cycle detected: {}", .0.join(" -> "))]
  Cycle(Vec<String>),

  #[error("stage '{0}' is unreachable from the start stage")]
  Unreachable(String),
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
