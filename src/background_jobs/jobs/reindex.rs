//! Periodic reconciliation of the song store with the data directory.

use crate::background_jobs::{
    context::JobContext,
    job::{BackgroundJob, HookEvent, JobError, JobSchedule, ShutdownBehavior},
};
use crate::server::metrics;
use std::time::Duration;
use tracing::info;

pub const REINDEX_JOB_ID: &str = "reindex";

/// Runs a reconciliation pass on startup and then every `interval`.
pub struct ReindexJob {
    interval: Option<Duration>,
}

impl ReindexJob {
    /// A zero interval means the job only runs on startup and on demand.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: (!interval.is_zero()).then_some(interval),
        }
    }
}

impl BackgroundJob for ReindexJob {
    fn id(&self) -> &'static str {
        REINDEX_JOB_ID
    }

    fn name(&self) -> &'static str {
        "Reindex"
    }

    fn description(&self) -> &'static str {
        "Reconcile indexed songs with the metadata files on disk"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::Combined {
            interval: self.interval,
            hooks: vec![HookEvent::OnStartup],
        }
    }

    fn shutdown_behavior(&self) -> ShutdownBehavior {
        // A pass stops at a song boundary only, let it finish.
        ShutdownBehavior::WaitForCompletion
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        match ctx.library.reindex_now() {
            Ok(report) => {
                info!(
                    "Reindex done: {} files seen, {} indexed, {} skipped, {} removed",
                    report.files_seen,
                    report.files_indexed,
                    report.files_skipped,
                    report.files_removed
                );
                metrics::record_reindex(&report);
                if let Ok(info) = ctx.library.info() {
                    metrics::set_songs_total(info.loaded);
                    metrics::set_db_size_bytes(info.db_size_bytes);
                }
                Ok(())
            }
            Err(e) => {
                metrics::record_reindex_failure();
                Err(JobError::ExecutionFailed(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{LibrarySettings, SongDb};
    use crate::song_file::SourceEncoding;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    fn context(dir: &TempDir) -> JobContext {
        let data_dir = dir.path().join("data");
        std::fs::create_dir_all(&data_dir).unwrap();
        std::fs::write(data_dir.join("disc.txt"), "title:A\n-\ntitle:B\n").unwrap();
        let library = SongDb::open(&LibrarySettings {
            database: dir.path().join("songdb.db"),
            data_dir,
            encoding: SourceEncoding::Utf8,
            patterns: vec!["*.txt".to_string()],
            max_results: 10,
        })
        .unwrap();
        JobContext::new(CancellationToken::new(), Arc::new(library))
    }

    #[test]
    fn zero_interval_means_startup_only() {
        let job = ReindexJob::new(Duration::ZERO);
        assert_eq!(job.schedule().interval(), None);
        assert!(job.schedule().runs_on(HookEvent::OnStartup));

        let job = ReindexJob::new(Duration::from_secs(300));
        assert_eq!(job.schedule().interval(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn execute_indexes_library() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);

        ReindexJob::new(Duration::ZERO).execute(&ctx).unwrap();
        assert_eq!(ctx.library.info().unwrap().loaded, 2);
    }

    #[test]
    fn cancelled_context_skips_pass() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        ctx.cancellation_token.cancel();

        assert_eq!(
            ReindexJob::new(Duration::ZERO).execute(&ctx),
            Err(JobError::Cancelled)
        );
        assert_eq!(ctx.library.info().unwrap().loaded, 0);
    }

    #[test]
    fn failed_pass_is_reported() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        std::fs::remove_dir_all(dir.path().join("data")).unwrap();

        let result = ReindexJob::new(Duration::ZERO).execute(&ctx);
        assert!(matches!(result, Err(JobError::ExecutionFailed(_))));
        assert!(ctx.library.info().unwrap().last_reindex_failed);
    }
}
