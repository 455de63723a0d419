// imgflow-service/src/web/handlers/image_handlers.rs

use actix_web::{web, HttpResponse};
use imgflow::TriggerEvent;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

/// Body of the uniform `202` acknowledgment.
#[derive(Debug, Serialize)]
pub struct TriggerAccepted {
  pub status: &'static str,
  pub item_key: String,
  pub request_id: Uuid,
}

/// Accepts an upload event and runs the pipeline for it in the background.
///
/// Every trigger that resolves to an item key gets the same `202` acknowledgment; the outcome
/// is reported through the notification stage and the status record, not this response.
#[instrument(name = "handler::trigger_image", skip(app_state, body))]
pub async fn trigger_image_handler(
  app_state: web::Data<AppState>,
  body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
  let trigger = TriggerEvent::from_json(&body)?;
  let item_key = trigger.item_key.clone();
  let request_id = Uuid::new_v4();
  info!(%item_key, %request_id, "Trigger accepted.");

  let engine = app_state.engine.clone();
  actix_web::rt::spawn(async move {
    match engine.run(trigger).await {
      Ok(outcome) => info!(
        %request_id,
        item_key = %outcome.context.item_key(),
        status = ?outcome.status,
        "Background pipeline run finished."
      ),
      Err(e) => warn!(%request_id, error = %e, "Background pipeline run was rejected."),
    }
  });

  Ok(HttpResponse::Accepted().json(TriggerAccepted {
    status: "accepted",
    item_key,
    request_id,
  }))
}
