use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::{fmt::Debug, path::PathBuf};
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use push_store::config::{self, BackendKind};
use push_store::connection::{redact_url, RedisConnection, DEFAULT_REDIS_URL};
use push_store::kv::{KeyValueBackend, MemoryBackend, RedisBackend};
use push_store::metrics;
use push_store::notifications::{NotificationStore, DEFAULT_TTL};
use push_store::server::{run_server, RequestsLoggingLevel, ServerConfig};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Redis connection URL.
    #[clap(long, env = "REDIS_URL", default_value = DEFAULT_REDIS_URL)]
    pub redis_url: String,

    /// Storage backend for notifications.
    #[clap(long, value_enum, default_value_t = BackendKind::Redis)]
    pub backend: BackendKind,

    /// The address to bind both listeners to.
    #[clap(long, default_value = "0.0.0.0")]
    pub bind_address: String,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 8000)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Expiry applied to notifications and their index sets, in seconds.
    #[clap(long, default_value_t = DEFAULT_TTL.as_secs())]
    pub ttl_secs: u64,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            redis_url: args.redis_url.clone(),
            backend: args.backend,
            bind_address: args.bind_address.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            ttl_secs: args.ttl_secs,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  backend: {:?}", app_config.backend);
    info!("  redis_url: {}", redact_url(&app_config.redis_url));
    info!("  ttl: {}s", app_config.store.ttl.as_secs());

    info!("Initializing metrics...");
    metrics::init_metrics();

    let mut redis_connection: Option<Arc<RedisConnection>> = None;
    let backend: Arc<dyn KeyValueBackend> = match app_config.backend {
        BackendKind::Redis => {
            let connection = Arc::new(RedisConnection::new(app_config.redis_url.clone()));
            // Keep serving on failure, /health reports unhealthy until redis is back
            if let Err(e) = connection.connect().await {
                warn!("Starting without a backing store: {}", e);
            }
            redis_connection = Some(connection.clone());
            Arc::new(RedisBackend::new(connection))
        }
        BackendKind::Memory => {
            warn!("Using the in-memory backend, notifications are lost on restart");
            Arc::new(MemoryBackend::new())
        }
    };

    let notification_store = Arc::new(NotificationStore::new(
        backend.clone(),
        app_config.store.clone(),
    ));

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        bind_address: app_config.bind_address.clone(),
        port: app_config.port,
        metrics_port: app_config.metrics_port,
    };

    info!("Ready to serve at port {}!", app_config.port);
    info!("Metrics available at port {}!", app_config.metrics_port);

    let result = run_server(server_config, notification_store, backend).await;
    info!("HTTP server stopped: {:?}", result);

    if let Some(connection) = redis_connection {
        connection.disconnect().await;
    }

    result
}
