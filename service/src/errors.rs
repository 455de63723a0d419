// imgflow-service/src/errors.rs

use actix_web::{HttpResponse, ResponseError};
use imgflow::FlowError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Pipeline Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    AppError::Internal(format!("{:#}", err))
  }
}

impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    tracing::error!(application_error = %self, "Responding with error");
    match self {
      AppError::Config(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Configuration issue", "detail": m}))
      }
      // A trigger that does not resolve to an item key is the caller's fault.
      AppError::Workflow {
        source: FlowError::InvalidTrigger { reason },
      } => HttpResponse::BadRequest().json(json!({"error": "Invalid trigger event", "detail": reason})),
      AppError::Workflow { source } => {
        tracing::error!(flow_error_source = ?source, "Pipeline error details");
        HttpResponse::InternalServerError()
          .json(json!({"error": "Pipeline processing error", "detail": source.to_string()}))
      }
      AppError::Internal(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "An internal error occurred", "detail": m}))
      }
    }
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
