//! Configuration types and loading
//!
//! Config path precedence: `--config` CLI arg > `CONFIG_PATH` env var >
//! `hospital-health-check.toml`. The session access token is never read from
//! the TOML itself: it comes from `API_ACCESS_TOKEN` or `access_token_file`.

use std::path::{Path, PathBuf};

use api_client::{PublicEndpoints, RetryPolicy};
use common::Secret;
use serde::Deserialize;

/// Env var holding a bearer token for the probe session.
pub const ACCESS_TOKEN_ENV: &str = "API_ACCESS_TOKEN";

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Hospital API connection settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Routes that never receive the session token.
    #[serde(default)]
    pub public_endpoints: PublicEndpoints,
}

/// Health probe settings
#[derive(Debug, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_health_path")]
    pub path: String,
    /// Re-probe every N seconds until shutdown; probe once when absent.
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            path: default_health_path(),
            interval_secs: None,
        }
    }
}

/// Session credentials for authenticated probes
#[derive(Debug, Default, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub access_token_file: Option<PathBuf>,
    #[serde(skip)]
    pub access_token: Option<Secret<String>>,
}

fn default_timeout() -> u64 {
    10
}

fn default_health_path() -> String {
    "/health".to_string()
}

impl Config {
    /// Load configuration from a TOML file, validate it, then resolve the
    /// access token (`API_ACCESS_TOKEN` first, then `access_token_file`).
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| common::Error::read(path, e))?;
        let mut config: Config = toml::from_str(&contents)?;
        config.validate()?;

        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            let token = Secret::new(token.trim().to_owned());
            if !token.is_blank() {
                config.session.access_token = Some(token);
            }
        } else if let Some(ref token_file) = config.session.access_token_file {
            let token = std::fs::read_to_string(token_file)
                .map_err(|e| common::Error::read(token_file, e))?;
            let token = Secret::new(token.trim().to_owned());
            if !token.is_blank() {
                config.session.access_token = Some(token);
            }
        }

        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(common::Error::Config(format!(
                "retry.max_delay_ms ({}) must be >= retry.base_delay_ms ({})",
                self.retry.max_delay_ms, self.retry.base_delay_ms
            )));
        }

        if self.health.interval_secs == Some(0) {
            return Err(common::Error::Config(
                "health.interval_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("hospital-health-check.toml")
    }
}
