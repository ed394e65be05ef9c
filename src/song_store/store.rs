//! SQLite-backed song store.
//!
//! Writes go through a single long-lived connection guarded by a mutex and
//! exposed as a [`StoreWriter`]. Reads open a short-lived read-only
//! connection per call and rely on WAL mode for isolation from the writer.

use super::schema::{
    dimension_table, fact_column, song_schema, FACT_TABLE, FILE_COLUMN, FILE_TABLE, SONG_VIEW,
};
use crate::attributes::{AttributeCatalog, AttributeDescriptor, AttributeValue};
use crate::sqlite_persistence::VersionedSchema;
use anyhow::{bail, Context, Result};
use rusqlite::{params, params_from_iter, Connection, OpenFlags, ToSql};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// A song as stored: its fact id and one value per catalog attribute, in
/// catalog order. Absent attributes hold their sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSong {
    pub id: i64,
    pub values: Vec<AttributeValue>,
    pub file: String,
}

/// Bookkeeping row for one indexed source file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub id: i64,
    pub path: String,
    /// `None` while the file's records are being (re)written.
    pub mtime: Option<f64>,
}

#[derive(Clone)]
pub struct SqliteSongStore {
    db_path: PathBuf,
    catalog: Arc<AttributeCatalog>,
    write_conn: Arc<Mutex<Connection>>,
    select_sql: Arc<str>,
    insert_fact_sql: Arc<str>,
}

fn create_or_validate(conn: &Connection, catalog: &AttributeCatalog) -> Result<()> {
    let schema = song_schema(catalog);
    if VersionedSchema::is_blank(conn)? {
        info!("Creating song db schema at version {}", schema.version);
        conn.execute("BEGIN IMMEDIATE", [])?;
        match schema.create(conn) {
            Ok(()) => {
                conn.execute("COMMIT", [])?;
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                return Err(e);
            }
        }
        return Ok(());
    }
    schema
        .validate(conn)
        .context("Existing song database does not match the attribute catalog")
}

impl SqliteSongStore {
    /// Opens the store at `db_path`, creating the schema on first use.
    /// An existing database is reused as-is.
    pub fn open<P: AsRef<Path>>(db_path: P, catalog: Arc<AttributeCatalog>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        let write_conn = Connection::open_with_flags(
            &db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open song database {}", db_path.display()))?;
        write_conn.pragma_update(None, "journal_mode", "WAL")?;
        write_conn.pragma_update(None, "foreign_keys", "ON")?;
        write_conn.busy_timeout(BUSY_TIMEOUT)?;

        create_or_validate(&write_conn, &catalog)?;

        let song_count: i64 = write_conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", FACT_TABLE), [], |r| {
                r.get(0)
            })
            .context("Failed to count stored songs")?;
        info!(
            "Opened song database {}: {} songs",
            db_path.display(),
            song_count
        );

        let columns = catalog
            .descriptors()
            .iter()
            .map(|d| format!("\"{}\"", d.name))
            .collect::<Vec<_>>()
            .join(", ");
        let select_sql = format!(
            "SELECT id, {}, \"{}\" FROM {}",
            columns, FILE_COLUMN, SONG_VIEW
        );

        let fact_columns: Vec<String> = catalog
            .descriptors()
            .iter()
            .map(|d| fact_column(d.name))
            .chain(std::iter::once(fact_column(FILE_COLUMN)))
            .collect();
        let placeholders = (1..=fact_columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let insert_fact_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            FACT_TABLE,
            fact_columns.join(", "),
            placeholders
        );

        Ok(SqliteSongStore {
            db_path,
            catalog,
            write_conn: Arc::new(Mutex::new(write_conn)),
            select_sql: select_sql.into(),
            insert_fact_sql: insert_fact_sql.into(),
        })
    }

    pub fn catalog(&self) -> &AttributeCatalog {
        &self.catalog
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Exclusive access to the write connection for the caller's lifetime.
    pub fn writer(&self) -> StoreWriter<'_> {
        StoreWriter {
            conn: self.write_conn.lock().unwrap(),
            catalog: &self.catalog,
            insert_fact_sql: &self.insert_fact_sql,
        }
    }

    fn open_read_conn(&self) -> Result<Connection> {
        let conn = Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open read connection")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    fn parse_song_row(&self, row: &rusqlite::Row) -> rusqlite::Result<StoredSong> {
        let count = self.catalog.len();
        let mut values = Vec::with_capacity(count);
        for index in 0..count {
            values.push(row.get::<_, AttributeValue>(index + 1)?);
        }
        Ok(StoredSong {
            id: row.get(0)?,
            values,
            file: row.get(count + 1)?,
        })
    }

    pub fn fetch_song(&self, id: i64) -> Result<Option<StoredSong>> {
        let conn = self.open_read_conn()?;
        let sql = format!("{} WHERE id = ?1", self.select_sql);
        match conn.query_row(&sql, params![id], |row| self.parse_song_row(row)) {
            Ok(song) => Ok(Some(song)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Runs `SELECT ... FROM v_song WHERE <where_sql>` with positional
    /// parameters, ordered by song id.
    pub fn query_songs(
        &self,
        where_sql: &str,
        params: &[&dyn ToSql],
        limit: usize,
    ) -> Result<Vec<StoredSong>> {
        let conn = self.open_read_conn()?;
        let sql = format!(
            "{} WHERE {} ORDER BY id LIMIT {}",
            self.select_sql, where_sql, limit
        );
        debug!("Song query: {}", sql);
        let mut stmt = conn.prepare(&sql)?;
        let songs = stmt
            .query_map(params, |row| self.parse_song_row(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(songs)
    }

    pub fn count_songs(&self) -> Result<usize> {
        let conn = self.open_read_conn()?;
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", SONG_VIEW), [], |r| {
            r.get(0)
        })?;
        Ok(count as usize)
    }

    pub fn count_files(&self) -> Result<usize> {
        let conn = self.open_read_conn()?;
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", FILE_TABLE), [], |r| {
            r.get(0)
        })?;
        Ok(count as usize)
    }

    /// On-disk size of the database, write-ahead log included.
    pub fn db_size_bytes(&self) -> Result<u64> {
        let metadata = std::fs::metadata(&self.db_path)
            .with_context(|| format!("Failed to stat {}", self.db_path.display()))?;
        let mut wal_path = self.db_path.clone().into_os_string();
        wal_path.push("-wal");
        let wal_size = std::fs::metadata(wal_path).map(|m| m.len()).unwrap_or(0);
        Ok(metadata.len() + wal_size)
    }
}

/// Write half of the store. Holding one serializes all writers.
pub struct StoreWriter<'a> {
    conn: MutexGuard<'a, Connection>,
    catalog: &'a AttributeCatalog,
    insert_fact_sql: &'a str,
}

impl StoreWriter<'_> {
    /// Runs `f` inside `BEGIN IMMEDIATE`, committing on success and rolling
    /// back on error.
    pub fn in_transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        self.conn.execute("BEGIN IMMEDIATE", [])?;
        match f(self) {
            Ok(value) => {
                self.conn.execute("COMMIT", [])?;
                Ok(value)
            }
            Err(e) => {
                let _ = self.conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }

    /// Returns the id of `value` in the attribute's distinct-value table,
    /// inserting it first when absent.
    pub fn ensure_value(
        &self,
        descriptor: &AttributeDescriptor,
        value: &AttributeValue,
    ) -> Result<i64> {
        let table = dimension_table(descriptor.name);
        self.conn
            .prepare_cached(&format!(
                "INSERT OR IGNORE INTO {} (value) VALUES (?1)",
                table
            ))?
            .execute(params![value])?;
        let id = self
            .conn
            .prepare_cached(&format!("SELECT id FROM {} WHERE value = ?1", table))?
            .query_row(params![value], |row| row.get(0))
            .with_context(|| format!("Failed to resolve {} value {:?}", descriptor.name, value))?;
        Ok(id)
    }

    /// Inserts a song fact. `value_ids` holds one id per catalog attribute,
    /// in catalog order.
    pub fn insert_fact(&self, value_ids: &[i64], file_id: i64) -> Result<i64> {
        if value_ids.len() != self.catalog.len() {
            bail!(
                "Song fact needs {} value ids, got {}",
                self.catalog.len(),
                value_ids.len()
            );
        }
        self.conn
            .prepare_cached(self.insert_fact_sql)?
            .execute(params_from_iter(
                value_ids.iter().chain(std::iter::once(&file_id)),
            ))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn delete_facts_for_file(&self, file_id: i64) -> Result<usize> {
        let deleted = self.conn.execute(
            &format!(
                "DELETE FROM {} WHERE {} = ?1",
                FACT_TABLE,
                fact_column(FILE_COLUMN)
            ),
            params![file_id],
        )?;
        Ok(deleted)
    }

    /// Creates or updates the record for `path`, returning its id.
    pub fn upsert_file_record(&self, path: &str, mtime: Option<f64>) -> Result<i64> {
        let id = self.conn.query_row(
            &format!(
                "INSERT INTO {} (value, mtime) VALUES (?1, ?2) \
                 ON CONFLICT(value) DO UPDATE SET mtime = excluded.mtime \
                 RETURNING id",
                FILE_TABLE
            ),
            params![path, mtime],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn file_records(&self) -> Result<HashMap<String, FileRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT id, value, mtime FROM {}", FILE_TABLE))?;
        let records = stmt
            .query_map([], |row| {
                Ok(FileRecord {
                    id: row.get(0)?,
                    path: row.get(1)?,
                    mtime: row.get(2)?,
                })
            })?
            .map(|r| r.map(|record| (record.path.clone(), record)))
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;
        Ok(records)
    }

    pub fn all_file_paths(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT value FROM {} ORDER BY value", FILE_TABLE))?;
        let paths = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(paths)
    }

    /// Removes a file record together with its song facts.
    pub fn delete_file_record(&self, path: &str) -> Result<bool> {
        let deleted = self.conn.execute(
            &format!("DELETE FROM {} WHERE value = ?1", FILE_TABLE),
            params![path],
        )?;
        Ok(deleted > 0)
    }
}
