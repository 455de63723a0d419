// imgflow-service/src/state.rs
use crate::config::AppConfig;
use imgflow::{Engine, StatusQuery};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub engine: Arc<Engine>,
  pub status_query: StatusQuery,
  pub config: Arc<AppConfig>,
}
