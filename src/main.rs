use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use tenant_platform::config::loader::apply_env_overrides;
use tenant_platform::config::validation::validate_config;
use tenant_platform::config::watcher::ConfigWatcher;
use tenant_platform::config::{load_config, ConfigError, PlatformConfig};
use tenant_platform::lifecycle::{bootstrap, drain, spawn_signal_handler, Backends, Shutdown, DRAIN_TIMEOUT};
use tenant_platform::observability::{logging, metrics};
use tenant_platform::HttpServer;

#[derive(Parser)]
#[command(name = "tenant-platform")]
#[command(about = "Multi-tenant SaaS platform API server", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Watched for changes.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn initial_config(path: Option<&PathBuf>) -> Result<PlatformConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let mut config = PlatformConfig::default();
            apply_env_overrides(&mut config, |key| std::env::var(key).ok());
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = initial_config(args.config.as_ref())?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "tenant-platform starting");

    if config.auth.jwt_secret == PlatformConfig::default().auth.jwt_secret {
        tracing::warn!("Using the placeholder signing secret; set PLATFORM_JWT_SECRET");
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        rate_limit_enabled = config.rate_limit.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // The watcher must stay alive for the life of the server.
    let (config_updates, _watcher) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (updates, Some(watcher.run()?))
        }
        None => {
            let (_tx, updates) = mpsc::unbounded_channel();
            (updates, None)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let backends = Backends::from_config(&config)?;
    let platform = bootstrap(config, backends, &shutdown)?;

    let server = HttpServer::new(platform.state);
    server.run(listener, config_updates, shutdown.signalled()).await?;

    // Covers the server exiting on its own as well as by signal.
    shutdown.trigger();
    drain("task-worker", platform.worker, DRAIN_TIMEOUT).await;
    drain("scheduler", platform.scheduler, DRAIN_TIMEOUT).await;

    tracing::info!("Shutdown complete");
    Ok(())
}
