// imgflow-service/src/main.rs

mod config;
mod errors;
mod services;
mod state;
mod web;

use crate::config::{AppConfig, LogFormat};
use crate::services::imaging::LocalImageStore;
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use imgflow::{ImagePipeline, JsonFileStatusStore, OutboxChannel, StatusQuery, StatusStore, StatusStoreAccessor};
use std::io;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

fn init_tracing(format: LogFormat) {
  let builder = tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()) // Allow RUST_LOG override
    .with_span_events(FmtSpan::CLOSE);
  match format {
    LogFormat::Text => builder.init(),
    LogFormat::Json => builder.json().init(),
  }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
  let log_format = LogFormat::from_env().map_err(|e| io::Error::other(e.to_string()))?;
  init_tracing(log_format);

  tracing::info!("Starting image processing server...");

  let mut app_config = AppConfig::from_env().map_err(|e| {
    tracing::error!(error = %e, "Failed to load application configuration.");
    io::Error::other(e.to_string())
  })?;

  if app_config.pipeline.detect_labels {
    tracing::warn!("USE_REKOGNITION is set but this server has no label detection backend; labels are disabled.");
    app_config.pipeline.detect_labels = false;
  }
  let app_config = Arc::new(app_config);

  tracing::info!(
    table = %app_config.pipeline.status_table,
    path = %app_config.status_store_path.display(),
    "Opening status store."
  );
  let status_store: Arc<dyn StatusStore> = Arc::new(
    JsonFileStatusStore::open(&app_config.status_store_path)
      .await
      .map_err(|e| {
        tracing::error!(error = %e, "Failed to open status store.");
        io::Error::other(format!("{:#}", e))
      })?,
  );
  let images = Arc::new(LocalImageStore::new(
    app_config.source_root.clone(),
    app_config.thumbnails_root.clone(),
  ));

  let engine = ImagePipeline::builder(app_config.pipeline.clone())
    .thumbnail_renderer(images.clone())
    .metadata_extractor(images)
    .status_store(status_store.clone())
    .notification_channel(Arc::new(OutboxChannel::new()))
    .build()
    .map_err(|e| {
      tracing::error!(error = %e, "Failed to build the image pipeline.");
      io::Error::other(e.to_string())
    })?;
  tracing::info!(stages = engine.definition().len(), "Image pipeline ready.");

  let app_state = AppState {
    engine: Arc::new(engine),
    status_query: StatusQuery::new(StatusStoreAccessor::new(status_store)),
    config: app_config.clone(),
  };

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
