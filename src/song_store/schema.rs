//! SQLite schema for the song library.
//!
//! The schema is a small star: one distinct-value table per attribute
//! (`<attribute>_d`), a `file_d` table tracking indexed source files, and the
//! `song_f` fact table referencing one row of each. `v_song` flattens it back.
//! Table layout is derived from the attribute catalog.

use crate::attributes::{AttributeCatalog, StorageKind};
use crate::sqlite_column;
use crate::sqlite_persistence::{
    ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, View,
};

pub const SONG_SCHEMA_VERSION: usize = 0;

pub const FACT_TABLE: &str = "song_f";
pub const FILE_TABLE: &str = "file_d";
pub const SONG_VIEW: &str = "v_song";
/// Column of the flattened view holding the source file's relative path.
pub const FILE_COLUMN: &str = "file";

pub fn dimension_table(attribute: &str) -> String {
    format!("{}_d", attribute)
}

pub fn fact_column(attribute: &str) -> String {
    format!("{}_id", attribute)
}

fn sql_type(storage: StorageKind) -> SqlType {
    match storage {
        StorageKind::Text => SqlType::Text,
        StorageKind::Integer => SqlType::Integer,
    }
}

fn references(table: String, on_delete: ForeignKeyOnChange) -> Option<ForeignKey> {
    Some(ForeignKey {
        foreign_table: table,
        foreign_column: "id".to_string(),
        on_delete,
    })
}

fn file_table() -> Table {
    Table {
        name: FILE_TABLE.to_string(),
        columns: vec![
            sqlite_column!("id", SqlType::Integer, is_primary_key = true),
            sqlite_column!("value", SqlType::Text, non_null = true, is_unique = true),
            // NULL until every record of the file has been stored.
            sqlite_column!("mtime", SqlType::Real),
        ],
        indices: vec![],
    }
}

fn fact_table(catalog: &AttributeCatalog) -> Table {
    let mut columns = vec![sqlite_column!("id", SqlType::Integer, is_primary_key = true)];
    for descriptor in catalog.descriptors() {
        columns.push(sqlite_column!(
            fact_column(descriptor.name),
            SqlType::Integer,
            non_null = true,
            foreign_key = references(
                dimension_table(descriptor.name),
                ForeignKeyOnChange::NoAction
            )
        ));
    }
    columns.push(sqlite_column!(
        fact_column(FILE_COLUMN),
        SqlType::Integer,
        non_null = true,
        foreign_key = references(FILE_TABLE.to_string(), ForeignKeyOnChange::Cascade)
    ));
    Table {
        name: FACT_TABLE.to_string(),
        columns,
        indices: vec![(
            format!("idx_{}_{}", FACT_TABLE, fact_column(FILE_COLUMN)),
            fact_column(FILE_COLUMN),
        )],
    }
}

fn song_view(catalog: &AttributeCatalog) -> View {
    let mut projections = vec![format!("{}.id AS id", FACT_TABLE)];
    let mut joins = Vec::new();
    let dimensions = catalog
        .descriptors()
        .iter()
        .map(|d| d.name)
        .chain(std::iter::once(FILE_COLUMN));
    for name in dimensions {
        let table = dimension_table(name);
        projections.push(format!("{}.value AS \"{}\"", table, name));
        joins.push(format!(
            "JOIN {} ON {}.id = {}.{}",
            table,
            table,
            FACT_TABLE,
            fact_column(name)
        ));
    }
    View {
        name: SONG_VIEW.to_string(),
        select_sql: format!(
            "SELECT {} FROM {} {}",
            projections.join(", "),
            FACT_TABLE,
            joins.join(" ")
        ),
    }
}

/// Builds the full schema for `catalog`, dimension tables first.
pub fn song_schema(catalog: &AttributeCatalog) -> VersionedSchema {
    let mut tables: Vec<Table> = catalog
        .descriptors()
        .iter()
        .map(|descriptor| Table {
            name: dimension_table(descriptor.name),
            columns: vec![
                sqlite_column!("id", SqlType::Integer, is_primary_key = true),
                sqlite_column!(
                    "value",
                    sql_type(descriptor.storage()),
                    non_null = true,
                    is_unique = true
                ),
            ],
            indices: vec![],
        })
        .collect();
    tables.push(file_table());
    tables.push(fact_table(catalog));

    VersionedSchema {
        version: SONG_SCHEMA_VERSION,
        tables,
        views: vec![song_view(catalog)],
    }
}
