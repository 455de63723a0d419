// imgflow-service/src/web/handlers/mod.rs

pub mod image_handlers;
pub mod status_handlers;
