//! Configuration types for the vault engine.
//!
//! Configuration is read once (YAML file, environment, CLI flags) into an
//! immutable [`ServerConfig`] that is handed to the components needing it.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the local vault
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Absolute path to the vault directory
    pub path: PathBuf,
    /// File or directory names skipped while listing
    #[serde(default = "default_excluded_paths")]
    pub excluded_paths: HashSet<String>,
    /// Extensions (with leading dot) that count as notes when listing
    #[serde(default = "default_note_extensions")]
    pub note_extensions: HashSet<String>,
}

fn default_excluded_paths() -> HashSet<String> {
    [".obsidian", ".git", ".DS_Store"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_note_extensions() -> HashSet<String> {
    [".md"].iter().map(|s| s.to_string()).collect()
}

impl VaultConfig {
    /// Create a new vault config with builder
    pub fn builder(path: impl AsRef<Path>) -> VaultConfigBuilder {
        VaultConfigBuilder::new(path)
    }

    /// Validate the vault configuration
    pub fn validate(&self) -> Result<()> {
        if !self.path.exists() {
            return Err(Error::config_error(format!(
                "Vault path does not exist: {}",
                self.path.display()
            )));
        }

        if !self.path.is_dir() {
            return Err(Error::config_error(format!(
                "Vault path is not a directory: {}",
                self.path.display()
            )));
        }

        Ok(())
    }

    /// Whether a file name counts as a note
    pub fn is_note(&self, file_name: &str) -> bool {
        self.note_extensions
            .iter()
            .any(|ext| file_name.ends_with(ext.as_str()))
    }

    /// Whether a directory entry is skipped while listing
    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded_paths.contains(name)
    }
}

/// Builder for VaultConfig
pub struct VaultConfigBuilder {
    path: PathBuf,
    excluded_paths: HashSet<String>,
    note_extensions: HashSet<String>,
}

impl VaultConfigBuilder {
    /// Create a new builder; `~` and `$VAR` in the path are expanded
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: expand_path(path.as_ref()),
            excluded_paths: default_excluded_paths(),
            note_extensions: default_note_extensions(),
        }
    }

    /// Skip an additional file or directory name while listing
    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.excluded_paths.insert(name.into());
        self
    }

    /// Treat another extension (e.g. `.txt`) as a note
    pub fn note_extension(mut self, ext: impl Into<String>) -> Self {
        self.note_extensions.insert(ext.into());
        self
    }

    /// Build and validate
    pub fn build(self) -> Result<VaultConfig> {
        let config = VaultConfig {
            path: self.path,
            excluded_paths: self.excluded_paths,
            note_extensions: self.note_extensions,
        };
        config.validate()?;
        Ok(config)
    }
}

fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(raw) => match shellexpand::full(raw) {
            Ok(expanded) => PathBuf::from(expanded.as_ref()),
            Err(e) => {
                log::warn!("Could not expand vault path {}: {}", raw, e);
                path.to_path_buf()
            }
        },
        None => path.to_path_buf(),
    }
}

/// Connection settings for the remote vault API
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// When false every operation goes straight to the filesystem
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    /// Bearer token
    pub token: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 27123,
            token: String::new(),
            timeout_ms: 5_000,
        }
    }
}

impl ApiConfig {
    /// Base URL of the API, without trailing slash
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("enabled", &self.enabled)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("token", &if self.token.is_empty() { "" } else { "<redacted>" })
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Global server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub vault: VaultConfig,
    #[serde(default)]
    pub api: ApiConfig,
    /// Configuration profile name
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// fsync temp files before renaming them into place
    #[serde(default = "default_true")]
    pub sync_writes: bool,
}

fn default_profile() -> String {
    "default".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl ServerConfig {
    /// Create configuration for a vault with default settings
    pub fn new(vault: VaultConfig) -> Self {
        Self {
            vault,
            api: ApiConfig::default(),
            profile: default_profile(),
            log_level: default_log_level(),
            sync_writes: true,
        }
    }

    /// Replace the API settings
    pub fn with_api(mut self, api: ApiConfig) -> Self {
        self.api = api;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.vault.validate()?;

        if self.api.enabled {
            if self.api.host.trim().is_empty() {
                return Err(Error::config_error("API host cannot be empty"));
            }
            if self.api.timeout_ms == 0 {
                return Err(Error::config_error("API timeout must be greater than zero"));
            }
        }

        Ok(())
    }

    /// Vault root directory
    pub fn vault_root(&self) -> &Path {
        &self.vault.path
    }

    /// Load configuration from a YAML file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::config_error(format!(
                "Failed to load configuration from {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut config: ServerConfig = serde_yaml::from_str(&content)
            .map_err(|e| Error::config_error(format!("Invalid configuration: {}", e)))?;
        config.vault.path = expand_path(&config.vault.path);
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a YAML file
    pub async fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| Error::config_error(format!("Failed to serialize configuration: {}", e)))?;

        tokio::fs::write(path, yaml).await.map_err(|e| {
            Error::config_error(format!(
                "Failed to save configuration to {}: {}",
                path.display(),
                e
            ))
        })
    }
}
