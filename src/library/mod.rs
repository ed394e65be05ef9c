//! The song library: one object owning the catalog, the store, the indexer
//! and the query builder, shared by the HTTP layer and background jobs.

mod models;
mod status;

pub use models::{LibraryInfo, SongRow};
use status::IndexStatus;

use crate::attributes::{AttributeCatalog, DisplayValue};
use crate::error::{SongDbError, SongDbResult};
use crate::filter::compile_filter;
use crate::indexer::{FileMatcher, IndexReport, Indexer};
use crate::query::QueryBuilder;
use crate::song_file::SourceEncoding;
use crate::song_store::SqliteSongStore;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, error};

/// Everything the library needs to open its store and find its files.
#[derive(Debug, Clone, PartialEq)]
pub struct LibrarySettings {
    pub database: PathBuf,
    pub data_dir: PathBuf,
    pub encoding: SourceEncoding,
    pub patterns: Vec<String>,
    pub max_results: usize,
}

pub struct SongDb {
    catalog: Arc<AttributeCatalog>,
    store: SqliteSongStore,
    indexer: Indexer,
    query_builder: QueryBuilder,
    status: IndexStatus,
    max_results: usize,
    reindex_lock: Mutex<()>,
}

impl SongDb {
    pub fn open(settings: &LibrarySettings) -> Result<Self> {
        Self::open_with_catalog(settings, AttributeCatalog::standard())
    }

    pub fn open_with_catalog(settings: &LibrarySettings, catalog: AttributeCatalog) -> Result<Self> {
        let catalog = Arc::new(catalog);
        let store = SqliteSongStore::open(&settings.database, catalog.clone())?;
        let matcher = FileMatcher::new(&settings.patterns)?;
        Ok(Self {
            indexer: Indexer::new(&settings.data_dir, settings.encoding, matcher),
            query_builder: QueryBuilder::new(catalog.clone()),
            catalog,
            store,
            status: IndexStatus::default(),
            max_results: settings.max_results,
            reindex_lock: Mutex::new(()),
        })
    }

    pub fn catalog(&self) -> &AttributeCatalog {
        &self.catalog
    }

    /// Runs one reconciliation pass. Concurrent callers wait for the pass in
    /// progress to finish before starting their own.
    pub fn reindex_now(&self) -> SongDbResult<IndexReport> {
        let _guard = self.reindex_lock.lock().unwrap();
        let now = chrono::Utc::now().timestamp();
        match self.indexer.reindex(&self.store) {
            Ok(report) => {
                self.status.record_success(report.clone(), now);
                Ok(report)
            }
            Err(e) => {
                error!("Reindex failed: {:#}", e);
                self.status.record_failure(format!("{:#}", e), now);
                Err(SongDbError::Indexing(e))
            }
        }
    }

    /// Songs matching `filter`, ordered by id and capped at the configured
    /// maximum. A filter without any effective clause matches nothing.
    pub fn search(&self, filter: &str) -> SongDbResult<Vec<SongRow>> {
        let criteria = compile_filter(&self.catalog, filter)?;
        let Some(query) = self.query_builder.build(&criteria)? else {
            debug!("Filter has no criteria, returning no songs");
            return Ok(Vec::new());
        };
        let songs = self
            .store
            .query_songs(&query.where_sql, &query.param_refs(), self.max_results)?;
        Ok(songs
            .iter()
            .map(|song| SongRow::from_stored(&self.catalog, song))
            .collect())
    }

    pub fn fetch_by_id(&self, id: i64) -> SongDbResult<SongRow> {
        match self.store.fetch_song(id)? {
            Some(song) => Ok(SongRow::from_stored(&self.catalog, &song)),
            None => Err(SongDbError::NotFound(format!(
                "song with id {} does not exist",
                id
            ))),
        }
    }

    /// A single attribute of a song, `id` included. Absent attributes are
    /// not found.
    pub fn fetch_attribute(&self, id: i64, name: &str) -> SongDbResult<(&'static str, DisplayValue)> {
        let row = self.fetch_by_id(id)?;
        if name == "id" {
            return Ok(("id", DisplayValue::Integer(row.id)));
        }
        row.attributes
            .into_iter()
            .find(|(attribute, _)| *attribute == name)
            .ok_or_else(|| {
                SongDbError::NotFound(format!("attribute {} not found on song: {}", name, id))
            })
    }

    pub fn list_attribute_names(&self) -> Vec<&'static str> {
        self.catalog.sorted_names()
    }

    pub fn info(&self) -> SongDbResult<LibraryInfo> {
        let status = self.status.snapshot();
        let last = status.last_report.unwrap_or_default();
        Ok(LibraryInfo {
            loaded: self.store.count_songs()?,
            found: last.songs_indexed,
            warnings: last.warnings,
            db_size_bytes: self.store.db_size_bytes()?,
            last_reindex_failed: status.last_reindex_failed,
            last_reindex_error: status.last_error,
            last_reindex_at: status.last_reindex_at,
        })
    }
}
