//! Pre-configured profiles for different deployment scenarios
//!
//! - Development: verbose logging, short API timeout, durable writes
//! - Production: quieter logging, fsync on every commit
//! - Offline: remote API disabled, filesystem only

use crate::config::{ServerConfig, VaultConfig};
use crate::error::{Error, Result};
use std::str::FromStr;

/// Profile selector for pre-configured deployments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigProfile {
    /// Development: debug logging, fail over to the filesystem quickly
    Development,
    /// Production: info logging, durable writes
    Production,
    /// Offline: never contact the remote API
    Offline,
}

impl ConfigProfile {
    /// Create a ServerConfig for `vault` from this profile
    pub fn create_config(self, vault: VaultConfig) -> ServerConfig {
        let mut config = ServerConfig::new(vault);
        config.profile = self.name().to_string();

        match self {
            Self::Development => {
                config.log_level = "debug".to_string();
                config.api.timeout_ms = 2_000;
                config.sync_writes = true;
            }
            Self::Production => {
                config.log_level = "info".to_string();
                config.api.timeout_ms = 5_000;
                config.sync_writes = true;
            }
            Self::Offline => {
                config.log_level = "info".to_string();
                config.api.enabled = false;
                config.sync_writes = true;
            }
        }

        config
    }

    /// Profile name as used on the command line
    pub fn name(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Offline => "offline",
        }
    }
}

impl FromStr for ConfigProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "offline" => Ok(Self::Offline),
            other => Err(Error::config_error(format!(
                "Unknown profile '{}'. Valid options: development, production, offline",
                other
            ))),
        }
    }
}
