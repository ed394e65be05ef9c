mod reindex;

pub use reindex::{ReindexJob, REINDEX_JOB_ID};
