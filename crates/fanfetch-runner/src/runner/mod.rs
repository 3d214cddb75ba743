pub mod config;
pub mod consumer;
pub mod input;
pub mod telemetry;
