//! Library-level reconciliation tests against the fixture data directory

mod common;

use common::*;
use songdb::song_file::SourceEncoding;
use songdb::{LibrarySettings, SongDb};
use std::path::Path;
use std::time::{Duration, SystemTime};

fn open_library(data_dir: &Path, db_path: &Path) -> SongDb {
    SongDb::open(&LibrarySettings {
        database: db_path.to_path_buf(),
        data_dir: data_dir.to_path_buf(),
        encoding: SourceEncoding::Utf8,
        patterns: vec!["*.txt".to_string(), "*.txt.gz".to_string()],
        max_results: 100,
    })
    .unwrap()
}

fn touch(path: &Path, offset: Duration) {
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + offset).unwrap();
}

#[test]
fn test_first_pass_indexes_matching_files_only() {
    let (_dir, data_dir, db_path) = create_test_library().unwrap();
    let library = open_library(&data_dir, &db_path);

    let report = library.reindex_now().unwrap();

    assert_eq!(report.files_seen, 2);
    assert_eq!(report.files_indexed, 2);
    assert_eq!(report.songs_indexed, TOTAL_SONGS);
    assert_eq!(report.warnings, FIXTURE_WARNINGS);
    assert!(library.search("@artist:nobody").unwrap().is_empty());
}

#[test]
fn test_second_pass_skips_unchanged_files() {
    let (_dir, data_dir, db_path) = create_test_library().unwrap();
    let library = open_library(&data_dir, &db_path);
    library.reindex_now().unwrap();
    let before = library.search("@artist~zzz").unwrap();

    let report = library.reindex_now().unwrap();

    assert_eq!(report.files_skipped, 2);
    assert_eq!(report.files_indexed, 0);
    assert_eq!(report.songs_indexed, 0);
    // Untouched files keep their song ids
    assert_eq!(library.search("@artist~zzz").unwrap(), before);
    assert_eq!(library.info().unwrap().loaded, TOTAL_SONGS);
}

#[test]
fn test_changed_file_is_replaced_not_duplicated() {
    let (_dir, data_dir, db_path) = create_test_library().unwrap();
    let library = open_library(&data_dir, &db_path);
    library.reindex_now().unwrap();

    let path = data_dir.join("rock/first_album.txt");
    std::fs::write(&path, "artist:The Test Band\ntitle:Only Song Left\n").unwrap();
    touch(&path, Duration::from_secs(10));

    let report = library.reindex_now().unwrap();

    assert_eq!(report.files_indexed, 1);
    assert_eq!(report.files_skipped, 1);
    assert_eq!(report.songs_indexed, 1);
    let songs = library.search("@artist:the test band").unwrap();
    assert_eq!(songs.len(), 1);
    assert_eq!(library.info().unwrap().loaded, TOTAL_SONGS - 1);
}

#[test]
fn test_removed_and_added_files() {
    let (_dir, data_dir, db_path) = create_test_library().unwrap();
    let library = open_library(&data_dir, &db_path);
    library.reindex_now().unwrap();

    std::fs::remove_file(data_dir.join("jazz/collection.txt.gz")).unwrap();
    add_extra_file(&data_dir).unwrap();

    let report = library.reindex_now().unwrap();

    assert_eq!(report.files_removed, 1);
    assert_eq!(report.files_indexed, 1);
    assert_eq!(report.songs_indexed, EXTRA_SONGS);
    assert!(library.search("@genre:jazz").unwrap().is_empty());
    assert_eq!(library.info().unwrap().loaded, TOTAL_SONGS - 2 + EXTRA_SONGS);
}

#[test]
fn test_database_survives_reopen() {
    let (_dir, data_dir, db_path) = create_test_library().unwrap();
    {
        let library = open_library(&data_dir, &db_path);
        library.reindex_now().unwrap();
    }

    let library = open_library(&data_dir, &db_path);
    assert_eq!(library.info().unwrap().loaded, TOTAL_SONGS);

    let report = library.reindex_now().unwrap();
    assert_eq!(report.files_skipped, 2);
}

#[test]
fn test_missing_data_dir_sets_failure_flag() {
    let (dir, data_dir, db_path) = create_test_library().unwrap();
    let library = open_library(&data_dir, &db_path);
    library.reindex_now().unwrap();

    std::fs::remove_dir_all(&data_dir).unwrap();
    assert!(library.reindex_now().is_err());
    let info = library.info().unwrap();
    assert!(info.last_reindex_failed);
    // A failed pass keeps what was indexed before
    assert_eq!(info.loaded, TOTAL_SONGS);

    std::fs::create_dir_all(&data_dir).unwrap();
    library.reindex_now().unwrap();
    let info = library.info().unwrap();
    assert!(!info.last_reindex_failed);
    assert_eq!(info.loaded, 0);
    drop(dir);
}
