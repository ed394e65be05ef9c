//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own data directory and database.

use super::constants::*;
use super::fixtures::create_test_library;
use songdb::background_jobs::jobs::{ReindexJob, REINDEX_JOB_ID};
use songdb::background_jobs::{create_scheduler, JobContext, SchedulerHandle};
use songdb::server::{make_app, BasicCredentials, RequestsLoggingLevel, ServerConfig};
use songdb::song_file::SourceEncoding;
use songdb::{LibrarySettings, SongDb};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Test server instance with an isolated library
///
/// When dropped, the server and its scheduler shut down and temp resources
/// are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Directory scanned by the indexer, for tests that add or remove files
    pub data_dir: PathBuf,

    /// Direct access to the library behind the server
    pub library: Arc<SongDb>,

    // Private fields - keep resources alive until drop
    scheduler_handle: SchedulerHandle,
    _temp_dir: TempDir,
    shutdown_token: CancellationToken,
}

impl TestServer {
    /// Spawns a new test server on a random port without authentication
    pub async fn spawn() -> Self {
        Self::spawn_with(None).await
    }

    /// Spawns a test server requiring [`ADMIN_USER`] / [`ADMIN_PASS`]
    pub async fn spawn_with_auth() -> Self {
        Self::spawn_with(Some(BasicCredentials {
            username: ADMIN_USER.to_string(),
            password: ADMIN_PASS.to_string(),
        }))
        .await
    }

    /// This function:
    /// 1. Creates a temporary data directory with fixture files
    /// 2. Opens the library
    /// 3. Starts the job scheduler with a reindex job (startup hook only)
    /// 4. Binds to a random port (127.0.0.1:0) and spawns the server
    /// 5. Waits for the startup reindex and for the server to be ready
    ///
    /// # Panics
    ///
    /// Panics if any of these steps fails.
    async fn spawn_with(credentials: Option<BasicCredentials>) -> Self {
        let (temp_dir, data_dir, db_path) =
            create_test_library().expect("Failed to create test library");

        let library = Arc::new(
            SongDb::open(&LibrarySettings {
                database: db_path,
                data_dir: data_dir.clone(),
                encoding: SourceEncoding::Utf8,
                patterns: vec!["*.txt".to_string(), "*.txt.gz".to_string()],
                max_results: 100,
            })
            .expect("Failed to open library"),
        );

        let shutdown_token = CancellationToken::new();
        let job_context = JobContext::new(shutdown_token.child_token(), library.clone());
        let (mut scheduler, scheduler_handle) =
            create_scheduler(shutdown_token.clone(), job_context);
        scheduler
            .register_job(Arc::new(ReindexJob::new(Duration::ZERO)))
            .await;
        tokio::spawn(async move { scheduler.run().await });

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            host: "127.0.0.1".to_string(),
            port,
            credentials,
        };
        let app = make_app(config, library.clone(), Some(scheduler_handle.clone()))
            .expect("Failed to build app");

        let server_token = shutdown_token.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { server_token.cancelled().await })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            data_dir,
            library,
            scheduler_handle,
            _temp_dir: temp_dir,
            shutdown_token,
        };

        server.wait_for_startup_reindex().await;
        server.wait_for_ready().await;

        server
    }

    /// Waits until the startup reindex pass has been recorded and its job
    /// has finished, so a manual trigger starts a fresh pass
    async fn wait_for_startup_reindex(&self) {
        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(REINDEX_WAIT_TIMEOUT_MS);

        loop {
            let recorded = self
                .library
                .info()
                .expect("Library info unavailable")
                .last_reindex_at
                .is_some();
            let running = self
                .scheduler_handle
                .is_running(REINDEX_JOB_ID)
                .await
                .expect("Scheduler unavailable");
            if recorded && !running {
                return;
            }
            if start.elapsed() > timeout {
                panic!("No reindex pass within {}ms", REINDEX_WAIT_TIMEOUT_MS);
            }
            tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
        }
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
        // TempDir will be cleaned up automatically
    }
}
