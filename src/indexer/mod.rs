//! Reconciles the song store with the metadata files of a data directory.

mod walker;

pub use walker::{discover_files, DiscoveredFile, FileMatcher};

use crate::attributes::{AttributeCatalog, AttributeDescriptor, AttributeValue};
use crate::song_file::{media_name, read_source_file, RawRecord, RecordReader, SourceEncoding};
use crate::song_store::{FileRecord, SqliteSongStore, StoreWriter};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Files whose stored and current mtimes differ by at most this many seconds
/// count as unchanged.
pub const MTIME_TOLERANCE_SECS: f64 = 0.001;

pub const DEFAULT_PATTERNS: &[&str] = &["*.txt", "*.txt.gz"];

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub files_seen: usize,
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub files_removed: usize,
    pub songs_indexed: usize,
    pub warnings: usize,
    pub duration_ms: u64,
}

struct FileOutcome {
    songs: usize,
    warnings: usize,
}

fn mtime_changed(stored: f64, current: f64) -> bool {
    (stored - current).abs() > MTIME_TOLERANCE_SECS
}

pub struct Indexer {
    data_dir: PathBuf,
    encoding: SourceEncoding,
    matcher: FileMatcher,
}

impl Indexer {
    pub fn new<P: AsRef<Path>>(
        data_dir: P,
        encoding: SourceEncoding,
        matcher: FileMatcher,
    ) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            encoding,
            matcher,
        }
    }

    /// Runs one full pass. Every song is committed as soon as it is written,
    /// so an aborted pass keeps its progress and the next pass resumes from
    /// whatever files are still out of date.
    pub fn reindex(&self, store: &SqliteSongStore) -> Result<IndexReport> {
        let started = Instant::now();
        info!(
            "Loading data: {} ({})",
            self.data_dir.display(),
            self.encoding
        );

        let mut report = IndexReport::default();
        {
            let writer = store.writer();
            let known = writer.file_records()?;
            let discovered = discover_files(&self.data_dir, &self.matcher)?;
            let mut seen = HashSet::with_capacity(discovered.len());

            for file in &discovered {
                report.files_seen += 1;
                seen.insert(file.relative_path.as_str());

                let previous = known.get(&file.relative_path);
                let unchanged = previous
                    .and_then(|record| record.mtime)
                    .is_some_and(|stored| !mtime_changed(stored, file.mtime));
                if unchanged {
                    debug!("Skipping unchanged file: {}", file.relative_path);
                    report.files_skipped += 1;
                    continue;
                }

                let outcome = self
                    .index_file(&writer, store.catalog(), file, previous)
                    .with_context(|| format!("Failed to index {}", file.relative_path))?;
                report.files_indexed += 1;
                report.songs_indexed += outcome.songs;
                report.warnings += outcome.warnings;
            }

            for (path, record) in &known {
                if seen.contains(path.as_str()) {
                    continue;
                }
                writer.in_transaction(|w| {
                    let songs = w.delete_facts_for_file(record.id)?;
                    w.delete_file_record(path)?;
                    info!("Removed file: {} ({} songs)", path, songs);
                    Ok(())
                })?;
                report.files_removed += 1;
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        let found = store.count_songs()?;
        info!(
            "Found {} songs. Loaded {} songs from {} files with {} warnings in {} ms",
            found, report.songs_indexed, report.files_indexed, report.warnings, report.duration_ms
        );
        if report.warnings > 0 {
            warn!("Songs loaded with {} warnings", report.warnings);
        }
        Ok(report)
    }

    fn index_file(
        &self,
        writer: &StoreWriter<'_>,
        catalog: &AttributeCatalog,
        file: &DiscoveredFile,
        previous: Option<&FileRecord>,
    ) -> Result<FileOutcome> {
        info!("Loading file: {}", file.relative_path);
        let text = read_source_file(&file.absolute_path, self.encoding)?;
        let media = media_name(&file.absolute_path);

        let file_id = writer.in_transaction(|w| {
            let file_id = w.upsert_file_record(&file.relative_path, None)?;
            if previous.is_some() {
                let removed = w.delete_facts_for_file(file_id)?;
                debug!("Replacing {} songs of {}", removed, file.relative_path);
            }
            Ok(file_id)
        })?;

        let mut reader = RecordReader::new(&text, catalog, &media, &file.relative_path);
        let mut songs = 0;
        let mut value_warnings = 0;
        for record in reader.by_ref() {
            let values: Vec<AttributeValue> = catalog
                .descriptors()
                .iter()
                .map(|descriptor| {
                    resolve_value(descriptor, &record, &file.relative_path)
                        .unwrap_or_else(|| {
                            value_warnings += 1;
                            descriptor.sentinel()
                        })
                })
                .collect();

            writer.in_transaction(|w| {
                let value_ids = catalog
                    .descriptors()
                    .iter()
                    .zip(&values)
                    .map(|(descriptor, value)| w.ensure_value(descriptor, value))
                    .collect::<Result<Vec<i64>>>()?;
                w.insert_fact(&value_ids, file_id)
            })?;
            songs += 1;
        }

        writer.upsert_file_record(&file.relative_path, Some(file.mtime))?;
        Ok(FileOutcome {
            songs,
            warnings: reader.warnings() + value_warnings,
        })
    }
}

/// Canonical value of one attribute of `record`. Absent and blank values
/// resolve to the sentinel; `None` means the raw value was rejected.
fn resolve_value(
    descriptor: &AttributeDescriptor,
    record: &RawRecord,
    source_label: &str,
) -> Option<AttributeValue> {
    match record.get(descriptor.name) {
        Some(raw) if !raw.trim().is_empty() => match descriptor.normalize(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(
                    "Invalid {} value in file ({}): {}",
                    descriptor.name, source_label, e
                );
                None
            }
        },
        _ => Some(descriptor.sentinel()),
    }
}
