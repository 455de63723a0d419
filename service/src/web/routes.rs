// imgflow-service/src/web/routes.rs

use actix_web::web;

use crate::state::AppState;

async fn health_check_handler(app_state: web::Data<AppState>) -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({
    "status": "ok",
    "stages": app_state.engine.definition().len(),
    "thumbnail_sizes": app_state
      .config
      .pipeline
      .thumbnail_sizes
      .iter()
      .map(ToString::to_string)
      .collect::<Vec<_>>(),
    "time": chrono::Utc::now(),
  }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/images")
          .route(
            "",
            web::post().to(crate::web::handlers::image_handlers::trigger_image_handler),
          )
          .route(
            "/{image_id:.*}/status",
            web::get().to(crate::web::handlers::status_handlers::image_status_handler),
          ),
      ),
  );
}
