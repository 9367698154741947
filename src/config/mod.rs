//! Daemon configuration: TOML file, environment overrides, validation.

pub mod manager;
pub mod types;

pub use manager::ConfigManager;
pub use types::{AuthConfig, Config, LogConfig, ServerConfig, UserConfig};
