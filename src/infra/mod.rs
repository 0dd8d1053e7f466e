pub mod error;
pub mod settings_store;
pub mod telemetry;
