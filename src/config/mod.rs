mod file_config;

pub use file_config::{FileConfig, StoreConfig};

use crate::connection::DEFAULT_REDIS_URL;
use crate::notifications::{StoreSettings, DEFAULT_TTL};
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::time::Duration;

/// Upper bound for `ttl_secs`: ten years.
pub const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Which key-value backend the store runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BackendKind {
    #[default]
    Redis,
    /// Process-local storage, lost on restart. Meant for development.
    Memory,
}

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub redis_url: String,
    pub backend: BackendKind,
    pub bind_address: String,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub ttl_secs: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            backend: BackendKind::Redis,
            bind_address: "0.0.0.0".to_string(),
            port: 8000,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::Path,
            ttl_secs: DEFAULT_TTL.as_secs(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub redis_url: String,
    pub backend: BackendKind,
    pub bind_address: String,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub store: StoreSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let redis_url = file.redis_url.unwrap_or_else(|| cli.redis_url.clone());
        if redis_url.trim().is_empty() {
            bail!("redis_url cannot be empty");
        }

        let backend = match file.backend {
            Some(s) => match BackendKind::from_str(&s, true) {
                Ok(kind) => kind,
                Err(_) => bail!("Unknown backend {:?}, expected \"redis\" or \"memory\"", s),
            },
            None => cli.backend,
        };

        let bind_address = file
            .bind_address
            .unwrap_or_else(|| cli.bind_address.clone());
        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);
        if port == metrics_port {
            bail!("port and metrics_port must differ (both are {})", port);
        }

        let logging_level = match file.logging_level {
            Some(s) => match parse_logging_level(&s) {
                Some(level) => level,
                None => bail!("Unknown logging_level {:?}", s),
            },
            None => cli.logging_level.clone(),
        };

        let ttl_secs = file
            .store
            .and_then(|store| store.ttl_secs)
            .unwrap_or(cli.ttl_secs);
        if ttl_secs == 0 {
            bail!("ttl_secs must be greater than zero");
        }
        if ttl_secs > MAX_TTL_SECS {
            bail!(
                "ttl_secs must be at most {} (ten years), got {}",
                MAX_TTL_SECS,
                ttl_secs
            );
        }

        Ok(Self {
            redis_url,
            backend,
            bind_address,
            port,
            metrics_port,
            logging_level,
            store: StoreSettings {
                ttl: Duration::from_secs(ttl_secs),
            },
        })
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
