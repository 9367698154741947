//! Configuration Manager

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{bail, Context, Result};

use super::Config;

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file, falling back to defaults when the file
    /// does not exist.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

            config
                .validate()
                .context("Configuration validation failed")?;
            Ok(config)
        } else {
            tracing::warn!(
                "Configuration file not found at {}, using defaults",
                path.display()
            );
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from environment variables.
    pub fn load_from_env() -> Result<Config> {
        let mut config = Config::default();

        if let Ok(bind_addr) = std::env::var("SOCKSPIPE_BIND_ADDR") {
            config.server.bind_addr = bind_addr
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid SOCKSPIPE_BIND_ADDR: {}", bind_addr))?;
        }

        if let Ok(timeout) = std::env::var("SOCKSPIPE_SHUTDOWN_TIMEOUT") {
            config.server.shutdown_timeout = humantime::parse_duration(&timeout)
                .with_context(|| format!("Invalid SOCKSPIPE_SHUTDOWN_TIMEOUT: {}", timeout))?;
        }

        if let Ok(auth_enabled) = std::env::var("SOCKSPIPE_AUTH_ENABLED") {
            config.auth.enabled = auth_enabled
                .parse::<bool>()
                .with_context(|| format!("Invalid SOCKSPIPE_AUTH_ENABLED: {}", auth_enabled))?;
        }

        if let Ok(log_level) = std::env::var("SOCKSPIPE_LOG_LEVEL") {
            config.log.level = log_level;
        }

        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.auth.enabled && self.credentials().is_empty() {
            bail!("Authentication is enabled but no enabled users are configured");
        }
        for user in &self.auth.users {
            if user.username.is_empty() || user.username.len() > 255 {
                bail!("Username '{}' must be 1-255 bytes", user.username);
            }
            if user.password.len() > 255 {
                bail!("Password for user '{}' exceeds 255 bytes", user.username);
            }
        }
        Ok(())
    }
}
