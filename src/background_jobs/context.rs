use crate::library::SongDb;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Context provided to jobs during execution.
#[derive(Clone)]
pub struct JobContext {
    /// Token to check for cancellation/shutdown requests.
    pub cancellation_token: CancellationToken,

    pub library: Arc<SongDb>,
}

impl JobContext {
    pub fn new(cancellation_token: CancellationToken, library: Arc<SongDb>) -> Self {
        Self {
            cancellation_token,
            library,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }
}
