// imgflow/src/status/query.rs

//! Read side of the status store: the accessor and the mapping of lookups onto query responses.

use crate::error::{FlowError, FlowResult};
use crate::status::record::StatusRecord;
use crate::status::store::StatusStore;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{event, instrument, Level};

pub const MISSING_ID_ERROR: &str = "imageId path parameter is missing.";
pub const NOT_FOUND_MESSAGE: &str = "Image details not found for the given image identifier.";
pub const INTERNAL_ERROR: &str = "An internal server error occurred while processing your request.";

#[derive(Debug, Clone, PartialEq)]
pub enum StatusLookup {
  Found(StatusRecord),
  NotFound,
}

/// Read-only view over a status store.
#[derive(Clone)]
pub struct StatusStoreAccessor {
  store: Arc<dyn StatusStore>,
}

impl StatusStoreAccessor {
  pub fn new(store: Arc<dyn StatusStore>) -> Self {
    Self { store }
  }

  /// Absence is `StatusLookup::NotFound`. Only a store fault is an error.
  pub async fn get(&self, item_key: &str) -> FlowResult<StatusLookup> {
    match self.store.get(item_key).await {
      Ok(Some(record)) => Ok(StatusLookup::Found(record)),
      Ok(None) => Ok(StatusLookup::NotFound),
      Err(source) => Err(FlowError::Store { source }),
    }
  }
}

impl std::fmt::Debug for StatusStoreAccessor {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StatusStoreAccessor").finish_non_exhaustive()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusResponse {
  pub status_code: u16,
  pub body: Value,
}

impl StatusResponse {
  fn new(status_code: u16, body: Value) -> Self {
    Self { status_code, body }
  }
}

/// Status query boundary: maps an optional image id onto a status code and JSON body.
#[derive(Debug, Clone)]
pub struct StatusQuery {
  accessor: StatusStoreAccessor,
}

impl StatusQuery {
  pub fn new(accessor: StatusStoreAccessor) -> Self {
    Self { accessor }
  }

  /// `image_id` is used exactly as given; callers decode path parameters before calling.
  /// An absent or blank id is a 400.
  #[instrument(name = "StatusQuery::respond", skip(self))]
  pub async fn respond(&self, image_id: Option<&str>) -> StatusResponse {
    let image_id = match image_id.filter(|id| !id.trim().is_empty()) {
      Some(id) => id,
      None => {
        event!(Level::WARN, "Status query without image id.");
        return StatusResponse::new(400, json!({ "error": MISSING_ID_ERROR }));
      }
    };

    match self.accessor.get(image_id).await {
      Ok(StatusLookup::Found(record)) => StatusResponse::new(200, record.to_value()),
      Ok(StatusLookup::NotFound) => {
        event!(Level::INFO, image_id, "No status record for image.");
        StatusResponse::new(404, json!({ "message": NOT_FOUND_MESSAGE }))
      }
      Err(e) => {
        event!(Level::ERROR, image_id, error = %e, "Status lookup failed.");
        StatusResponse::new(500, json!({ "error": INTERNAL_ERROR }))
      }
    }
  }
}
