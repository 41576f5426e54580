//! pagewarden server
//!
//! Serves the page permission API over HTTP.

use clap::Parser;
use pagewarden::{
    config::{AppConfig, LogFormat, load_config},
    server::AppState,
    store::sqlite::connect,
    transport::{HttpConfig, build_app, run_http_blocking},
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// pagewarden - Page-level permissions layered on space roles
#[derive(Parser, Debug)]
#[command(name = "pagewarden")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "PAGEWARDEN_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "PAGEWARDEN_LOG_LEVEL")]
    log_level: Option<String>,

    /// HTTP server host
    #[arg(long, env = "PAGEWARDEN_HOST")]
    host: Option<String>,

    /// HTTP server port
    #[arg(long, env = "PAGEWARDEN_PORT")]
    port: Option<u16>,

    /// Database URL (overrides configuration and DATABASE_URL)
    #[arg(long, env = "PAGEWARDEN_DATABASE_URL")]
    database_url: Option<String>,
}

impl Args {
    /// CLI flags win over the loaded configuration
    fn apply(&self, config: &mut AppConfig) {
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(url) = &self.database_url {
            config.database.url = url.clone();
        }
    }
}

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before anything reads the environment
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Configuration is loaded before logging so the file can set the level
    let mut config = load_config(args.config.as_deref())?;
    args.apply(&mut config);
    pagewarden::config::validate_config(&config)?;

    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting pagewarden server"
    );

    let pool = connect(&config.database)
        .await
        .inspect_err(|e| error!(error = %e, "Failed to connect to database"))?;

    let state = AppState::from_pool(pool.clone(), &config.grants)
        .await
        .inspect_err(|e| error!(error = %e, "Failed to prepare database schema"))?;

    let http_config = HttpConfig::from_host_port(&config.server.host, config.server.port)?;
    run_http_blocking(build_app(state), http_config).await?;

    pool.close().await;
    Ok(())
}
