mod file_config;

pub use file_config::{AuthConfig, FileConfig};

use crate::indexer::{FileMatcher, DEFAULT_PATTERNS};
use crate::library::LibrarySettings;
use crate::server::{BasicCredentials, RequestsLoggingLevel, ServerConfig};
use crate::song_file::SourceEncoding;
use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::level_filters::LevelFilter;

pub const DEFAULT_DATABASE: &str = "songdb.db";
pub const DEFAULT_MAX_RESULTS: usize = 1000;
pub const DEFAULT_REINDEX_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_PORT: u16 = 5000;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub database: PathBuf,
    pub data_dir: Option<PathBuf>,
    pub encoding: String,
    pub patterns: Vec<String>,
    pub max_results: usize,
    pub reindex_interval_secs: u64,
    pub host: String,
    pub port: u16,
    pub require_auth: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub logging_level: RequestsLoggingLevel,
    pub log_level: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            data_dir: None,
            encoding: SourceEncoding::Utf8.to_string(),
            patterns: DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect(),
            max_results: DEFAULT_MAX_RESULTS,
            reindex_interval_secs: DEFAULT_REINDEX_INTERVAL_SECS,
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            require_auth: false,
            username: None,
            password: None,
            logging_level: RequestsLoggingLevel::Path,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: PathBuf,
    pub data_dir: PathBuf,
    pub encoding: SourceEncoding,
    pub patterns: Vec<String>,
    pub max_results: usize,
    /// Zero means reindex on startup and on demand only.
    pub reindex_interval: Duration,
    pub host: String,
    pub port: u16,
    pub credentials: Option<BasicCredentials>,
    pub logging_level: RequestsLoggingLevel,
    pub log_level: LevelFilter,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .or_else(|| cli.data_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("data_dir must be specified via --data-dir or in config file")
            })?;
        if !data_dir.exists() {
            bail!("Data directory does not exist: {:?}", data_dir);
        }
        if !data_dir.is_dir() {
            bail!("data_dir is not a directory: {:?}", data_dir);
        }

        let database = file
            .database
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.database.clone());
        if let Some(parent) = database.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                bail!("Database directory does not exist: {:?}", parent);
            }
        }

        let encoding_name = file.encoding.unwrap_or_else(|| cli.encoding.clone());
        let encoding = SourceEncoding::from_str(&encoding_name)
            .with_context(|| format!("Invalid encoding {:?}", encoding_name))?;

        let patterns = file.patterns.unwrap_or_else(|| cli.patterns.clone());
        if patterns.is_empty() {
            bail!("At least one file pattern is required");
        }
        FileMatcher::new(&patterns)?;

        let max_results = file.max_results.unwrap_or(cli.max_results);
        if max_results == 0 {
            bail!("max_results must be greater than zero");
        }

        let reindex_interval = Duration::from_secs(
            file.reindex_interval_secs
                .unwrap_or(cli.reindex_interval_secs),
        );

        let host = file.host.unwrap_or_else(|| cli.host.clone());
        let port = file.port.unwrap_or(cli.port);

        let logging_level = match file.logging_level {
            Some(s) => parse_logging_level(&s)
                .ok_or_else(|| anyhow::anyhow!("Invalid logging_level {:?}", s))?,
            None => cli.logging_level.clone(),
        };

        let log_level_name = file.log_level.unwrap_or_else(|| cli.log_level.clone());
        let log_level = LevelFilter::from_str(&log_level_name)
            .with_context(|| format!("Invalid log_level {:?}", log_level_name))?;

        // [auth] section takes precedence over CLI args
        let auth = file.auth.unwrap_or_default();
        let require_auth = auth.require_auth.unwrap_or(cli.require_auth);
        let credentials = if require_auth {
            let username = auth.username.or_else(|| cli.username.clone());
            let password = auth.password.or_else(|| cli.password.clone());
            match (username, password) {
                (Some(username), Some(password))
                    if !username.is_empty() && !password.is_empty() =>
                {
                    Some(BasicCredentials { username, password })
                }
                _ => bail!("Both username and password are required when require_auth is set"),
            }
        } else {
            None
        };

        Ok(Self {
            database,
            data_dir,
            encoding,
            patterns,
            max_results,
            reindex_interval,
            host,
            port,
            credentials,
            logging_level,
            log_level,
        })
    }

    pub fn library_settings(&self) -> LibrarySettings {
        LibrarySettings {
            database: self.database.clone(),
            data_dir: self.data_dir.clone(),
            encoding: self.encoding,
            patterns: self.patterns.clone(),
            max_results: self.max_results,
        }
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level.clone(),
            host: self.host.clone(),
            port: self.port,
            credentials: self.credentials.clone(),
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
