//! Service configuration resolution for songreg-web
//!
//! Each setting resolves CLI → ENV → TOML → compiled default. The environment
//! variable names are the ones deployments already set for this service.

use songreg_common::config::{env_value, resolve_setting, TomlConfig};
use songreg_common::{Error, Result};
use tracing::{info, warn};

pub const ENV_SECRET_KEY: &str = "FLASK_SECRET_KEY";
pub const ENV_BLOCKAPI_BASE_URL: &str = "BLOCKAPI_BASE_URL";
pub const ENV_BLOCKAPI_API_KEY: &str = "BLOCKAPI_API_KEY";
pub const ENV_WEBHOOK_URL: &str = "WEBHOOK_URL";
pub const ENV_PORT: &str = "PORT";
pub const ENV_HOST: &str = "SONGREG_HOST";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_BLOCKAPI_BASE_URL: &str = "https://blockapi.co.za/api/v1";
pub const DEV_SECRET_KEY: &str = "fallback-secret-for-dev-only";

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub blockapi_url: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// Secret used to sign flash cookies
    pub secret_key: String,
    /// BaaS API root, without trailing slash
    pub blockapi_base_url: String,
    /// Sent as `X-API-Key`; omitted when unset
    pub blockapi_api_key: Option<String>,
    /// Public URL of this service's webhook endpoint
    pub webhook_url: Option<String>,
}

impl ServiceConfig {
    /// Resolve every setting from the command line, environment and TOML
    pub fn resolve(cli: CliOverrides, toml: &TomlConfig) -> Result<Self> {
        let host = resolve_setting(cli.host, ENV_HOST, toml.host.clone())
            .map(|(host, _)| host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = resolve_port(cli.port, toml.port)?;

        let secret_key = match resolve_setting(None, ENV_SECRET_KEY, toml.secret_key.clone()) {
            Some((key, source)) => {
                info!("Secret key loaded from {}", source);
                key
            }
            None => {
                warn!(
                    "{} not configured, using development fallback secret",
                    ENV_SECRET_KEY
                );
                DEV_SECRET_KEY.to_string()
            }
        };

        let blockapi_base_url = resolve_setting(
            cli.blockapi_url,
            ENV_BLOCKAPI_BASE_URL,
            toml.blockapi.base_url.clone(),
        )
        .map(|(url, _)| url)
        .unwrap_or_else(|| DEFAULT_BLOCKAPI_BASE_URL.to_string())
        .trim_end_matches('/')
        .to_string();

        if !blockapi_base_url.starts_with("http://") && !blockapi_base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "BaaS base URL must be http(s): {}",
                blockapi_base_url
            )));
        }

        let blockapi_api_key =
            match resolve_setting(None, ENV_BLOCKAPI_API_KEY, toml.blockapi.api_key.clone()) {
                Some((key, source)) => {
                    info!("BaaS API key loaded from {}", source);
                    Some(key)
                }
                None => {
                    warn!(
                        "{} not configured, BaaS requests will be sent without X-API-Key",
                        ENV_BLOCKAPI_API_KEY
                    );
                    None
                }
            };

        let webhook_url = resolve_setting(None, ENV_WEBHOOK_URL, toml.webhook_url.clone())
            .map(|(url, _)| url);
        if webhook_url.is_none() {
            warn!(
                "{} not configured, BaaS notifications must be pointed at this service manually",
                ENV_WEBHOOK_URL
            );
        }

        Ok(Self {
            host,
            port,
            secret_key,
            blockapi_base_url,
            blockapi_api_key,
            webhook_url,
        })
    }

    /// `host:port` for binding the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn resolve_port(cli: Option<u16>, toml: Option<u16>) -> Result<u16> {
    if let Some(port) = cli {
        return Ok(port);
    }
    if let Some(raw) = env_value(ENV_PORT) {
        return raw
            .trim()
            .parse::<u16>()
            .map_err(|_| Error::Config(format!("{} is not a valid port: {}", ENV_PORT, raw)));
    }
    Ok(toml.unwrap_or(DEFAULT_PORT))
}

/// Log level: CLI → TOML `[logging] level`
pub fn resolve_log_level(cli: Option<String>, toml: &TomlConfig) -> String {
    cli.filter(|level| !level.trim().is_empty())
        .unwrap_or_else(|| toml.logging.level.clone())
}
