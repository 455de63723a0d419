// imgflow-service/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use imgflow::{PipelineConfig, ThumbnailSize};
use std::env;
use std::path::PathBuf;

/// Output format of the process log, selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
  #[default]
  Text,
  Json,
}

impl LogFormat {
  /// Read before tracing is installed, so the `.env` file is loaded here as well.
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::parse(env::var("LOG_FORMAT").ok().as_deref())
  }

  pub fn parse(raw: Option<&str>) -> Result<Self> {
    match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
      None | Some("") | Some("text") => Ok(LogFormat::Text),
      Some("json") => Ok(LogFormat::Json),
      Some(other) => Err(AppError::Config(format!("Invalid LOG_FORMAT value: '{}'", other))),
    }
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,

  /// Uploaded originals live under `{source_root}/{bucket}/{key}`.
  pub source_root: PathBuf,
  /// Thumbnails are written under `{thumbnails_root}/{thumbnails_bucket}/thumbnails/...`.
  pub thumbnails_root: PathBuf,
  pub status_store_path: PathBuf,

  pub pipeline: PipelineConfig,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from any variable source. Unset variables take their defaults.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());
    let defaults = PipelineConfig::default();

    let server_host = get("SERVER_HOST", "127.0.0.1");
    let server_port = get("SERVER_PORT", "8080")
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;

    let source_root = PathBuf::from(get("SOURCE_ROOT", "./data/uploads"));
    let thumbnails_root = PathBuf::from(get("THUMBNAILS_ROOT", "./data/processed"));
    let status_store_path = PathBuf::from(get("STATUS_STORE_PATH", "./data/status.json"));

    let thumbnail_sizes = match lookup("THUMBNAIL_SIZES") {
      Some(raw) => ThumbnailSize::parse_list(&raw),
      None => defaults.thumbnail_sizes.clone(),
    };
    let detect_labels = match get("USE_REKOGNITION", "false").trim().to_ascii_lowercase().as_str() {
      "true" => true,
      "false" => false,
      other => return Err(AppError::Config(format!("Invalid USE_REKOGNITION value: '{}'", other))),
    };

    let pipeline = PipelineConfig {
      source_bucket: get("SOURCE_BUCKET", &defaults.source_bucket),
      thumbnails_bucket: get("THUMBNAILS_S3_BUCKET", &defaults.thumbnails_bucket),
      thumbnail_sizes,
      status_table: get("DYNAMODB_TABLE_NAME", &defaults.status_table),
      notification_topic: get("NOTIFICATION_TOPIC", &defaults.notification_topic),
      detect_labels,
      ..defaults
    };
    pipeline
      .validate()
      .map_err(|e| AppError::Config(e.to_string()))?;

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      source_root,
      thumbnails_root,
      status_store_path,
      pipeline,
    })
  }
}
