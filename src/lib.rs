//! SongDb
//!
//! Indexes flat music metadata files into a dimensional SQLite schema and
//! answers attribute filter searches over them.

pub mod attributes;
pub mod background_jobs;
pub mod config;
pub mod error;
pub mod filter;
pub mod indexer;
pub mod library;
pub mod query;
pub mod server;
pub mod song_file;
pub mod song_store;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use error::{SongDbError, SongDbResult};
pub use indexer::IndexReport;
pub use library::{LibraryInfo, LibrarySettings, SongDb, SongRow};
pub use server::{run_server, RequestsLoggingLevel};
