// imgflow-service/src/services/mod.rs

pub mod imaging;
