use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// API server address
    #[serde(default = "default_address")]
    pub address: String,
    /// API server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Largest accepted request body in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_body_bytes() -> usize {
    32 * 1024 * 1024 // Camera uploads carry two full-size JPEGs
}

/// Capture storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root directory holding raw uploads, logs and lane folders
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    /// Number of lane folder pairs created on every upload
    #[serde(default = "default_lane_count")]
    pub lane_count: u32,
    /// URL prefix the storage root is served under
    #[serde(default = "default_mount_prefix")]
    pub mount_prefix: String,
    /// TrueType font used to stamp the plate onto classified images
    #[serde(default)]
    pub overlay_font: Option<PathBuf>,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("ANPR")
}

fn default_lane_count() -> u32 {
    4
}

fn default_mount_prefix() -> String {
    "/capturas".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            log_level: default_log_level(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            lane_count: default_lane_count(),
            mount_prefix: default_mount_prefix(),
            overlay_font: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl StorageConfig {
    /// Mount prefix with a single leading slash and no trailing slash
    pub fn normalized_mount_prefix(&self) -> String {
        let trimmed = self.mount_prefix.trim_matches('/');
        format!("/{}", trimmed)
    }
}

/// Load configuration from a file or use default
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) => {
            let config_str = std::fs::read_to_string(path)
                .context(format!("Failed to read config file: {:?}", path))?;

            let config = if path.extension().map_or(false, |ext| ext == "json") {
                serde_json::from_str(&config_str).context("Failed to parse JSON config")?
            } else if path.extension().map_or(false, |ext| ext == "toml") {
                toml::from_str(&config_str).context("Failed to parse TOML config")?
            } else {
                return Err(anyhow::anyhow!("Unsupported config file format"));
            };

            Ok(config)
        }
        None => Ok(Config::default()),
    }
}
