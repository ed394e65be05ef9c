use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use songdb::background_jobs::jobs::ReindexJob;
use songdb::background_jobs::{create_scheduler, JobContext};
use songdb::config::{self, AppConfig, FileConfig};
use songdb::server::{metrics, run_server, RequestsLoggingLevel};
use songdb::SongDb;

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[clap(version, about = "Index music metadata files and serve attribute searches")]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite song database file.
    #[clap(long, value_parser = parse_path, default_value = config::DEFAULT_DATABASE)]
    pub database: PathBuf,

    /// Directory scanned for metadata files. Can also be specified in config file.
    #[clap(long, value_parser = parse_path)]
    pub data_dir: Option<PathBuf>,

    /// Text encoding of the metadata files (utf-8 or latin-1).
    #[clap(long, default_value = "utf-8")]
    pub encoding: String,

    /// File name pattern selecting metadata files. Repeat for several patterns.
    #[clap(long = "pattern", default_values_t = ["*.txt".to_string(), "*.txt.gz".to_string()])]
    pub patterns: Vec<String>,

    /// Maximum number of songs returned by a search.
    #[clap(long, default_value_t = config::DEFAULT_MAX_RESULTS)]
    pub max_results: usize,

    /// Seconds between reindex passes. 0 reindexes on startup and on demand only.
    #[clap(long, default_value_t = config::DEFAULT_REINDEX_INTERVAL_SECS)]
    pub reindex_interval_secs: u64,

    /// The address to bind.
    #[clap(long, default_value = "127.0.0.1")]
    pub host: String,

    /// The port to listen on.
    #[clap(short, long, default_value_t = config::DEFAULT_PORT)]
    pub port: u16,

    /// Require HTTP basic authentication on song and admin routes.
    #[clap(long)]
    pub require_auth: bool,

    #[clap(long)]
    pub username: Option<String>,

    #[clap(long)]
    pub password: Option<String>,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Default tracing level, overridden by the LOG_LEVEL environment variable.
    #[clap(long, default_value = "info")]
    pub log_level: String,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            database: args.database.clone(),
            data_dir: args.data_dir.clone(),
            encoding: args.encoding.clone(),
            patterns: args.patterns.clone(),
            max_results: args.max_results,
            reindex_interval_secs: args.reindex_interval_secs,
            host: args.host.clone(),
            port: args.port,
            require_auth: args.require_auth,
            username: args.username.clone(),
            password: args.password.clone(),
            logging_level: args.logging_level.clone(),
            log_level: args.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = config::CliConfig::from(&cli_args);
    let app_config =
        AppConfig::resolve(&cli_config, file_config).context("Invalid configuration")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(app_config.log_level.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    info!("Initializing metrics...");
    metrics::init_metrics();

    info!(
        "Opening song database at {:?}, indexing {:?}...",
        app_config.database, app_config.data_dir
    );
    let library = Arc::new(SongDb::open(&app_config.library_settings())?);

    // Set up background job scheduler
    let shutdown_token = CancellationToken::new();
    let job_context = JobContext::new(shutdown_token.child_token(), library.clone());
    let (mut scheduler, scheduler_handle) =
        create_scheduler(shutdown_token.clone(), job_context);
    scheduler
        .register_job(Arc::new(ReindexJob::new(app_config.reindex_interval)))
        .await;
    info!(
        "Job scheduler initialized with {} job(s)",
        scheduler.job_count().await
    );

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, initiating graceful shutdown");
                signal_token.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    // Either side stopping cancels the token, which stops the other.
    let server = async {
        let result = run_server(
            app_config.server_config(),
            library,
            Some(scheduler_handle),
            shutdown_token.clone(),
        )
        .await;
        shutdown_token.cancel();
        result
    };
    let (result, ()) = tokio::join!(server, scheduler.run());
    result
}
