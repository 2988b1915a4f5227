//! Configuration loading and setting resolution
//!
//! Every setting resolves in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: a warning is logged and defaults apply.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Bootstrap configuration loaded from TOML file
///
/// Read once at startup; the service must restart to pick up changes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Address to bind the HTTP server to
    pub host: Option<String>,

    /// HTTP server port
    pub port: Option<u16>,

    /// Secret used to sign flash cookies
    pub secret_key: Option<String>,

    /// Public URL the BaaS platform calls back on
    pub webhook_url: Option<String>,

    /// BaaS API connection settings
    pub blockapi: BlockApiToml,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// `[blockapi]` table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BlockApiToml {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Load TOML config from `path`
    ///
    /// Missing file → defaults. Unreadable or malformed file → `Error::Config`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file {} not found, using environment and defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config = Self::parse(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

        info!("Loaded config file {}", path.display());
        Ok(config)
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Default config file location: `<config_dir>/songreg/config.toml`
///
/// Falls back to `./songreg.toml` on platforms without a config directory.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("songreg").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("songreg.toml"))
}

/// Read an environment variable, treating blank values as unset
pub fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(non_blank)
}

/// `Some` only for values with non-whitespace content
pub fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Resolve a string setting: CLI → ENV → TOML
///
/// Returns the value and the name of the tier it came from.
pub fn resolve_setting(
    cli: Option<String>,
    env_var_name: &str,
    toml: Option<String>,
) -> Option<(String, &'static str)> {
    if let Some(value) = cli.and_then(non_blank) {
        return Some((value, "command line"));
    }
    if let Some(value) = env_value(env_var_name) {
        return Some((value, "environment"));
    }
    toml.and_then(non_blank).map(|value| (value, "TOML"))
}
