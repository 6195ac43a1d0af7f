pub mod config;

pub use config::{AppConfig, DeviceType, NetworkSettings, RunSettings, TrainingSettings};
