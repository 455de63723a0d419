// imgflow-service/src/web/handlers/status_handlers.rs

use actix_web::{http::StatusCode, web, HttpResponse};
use tracing::instrument;

use crate::errors::AppError;
use crate::state::AppState;

/// `image_id` spans slashes, e.g. `uploads/cat.jpg`. Actix has already percent-decoded it.
#[instrument(name = "handler::image_status", skip(app_state, path), fields(image_id = %path.as_str()))]
pub async fn image_status_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let image_id = path.into_inner();
  let response = app_state.status_query.respond(Some(&image_id)).await;
  let status = StatusCode::from_u16(response.status_code)
    .map_err(|e| AppError::Internal(format!("invalid status code {}: {}", response.status_code, e)))?;
  Ok(HttpResponse::build(status).json(response.body))
}
