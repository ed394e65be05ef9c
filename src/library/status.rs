use crate::indexer::IndexReport;
use std::sync::Mutex;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStatusSnapshot {
    pub last_report: Option<IndexReport>,
    pub last_reindex_failed: bool,
    pub last_error: Option<String>,
    pub last_reindex_at: Option<i64>,
}

/// Outcome of the most recent reconciliation passes.
///
/// `last_report` keeps the last successful pass; a failure only flips the
/// sticky flag, which the next successful pass clears.
#[derive(Debug, Default)]
pub struct IndexStatus {
    inner: Mutex<IndexStatusSnapshot>,
}

impl IndexStatus {
    pub fn record_success(&self, report: IndexReport, at: i64) {
        let mut inner = self.inner.lock().unwrap();
        inner.last_report = Some(report);
        inner.last_reindex_failed = false;
        inner.last_error = None;
        inner.last_reindex_at = Some(at);
    }

    pub fn record_failure(&self, error: String, at: i64) {
        let mut inner = self.inner.lock().unwrap();
        inner.last_reindex_failed = true;
        inner.last_error = Some(error);
        inner.last_reindex_at = Some(at);
    }

    pub fn snapshot(&self) -> IndexStatusSnapshot {
        self.inner.lock().unwrap().clone()
    }
}
