//! Test fixture creation
//!
//! Builds a temporary data directory of metadata files plus a location for
//! the song database.

use super::constants::*;
use anyhow::Result;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Creates a temporary library with metadata files
///
/// Returns (TempDir, data_dir, database path). The TempDir must be kept alive
/// for as long as the files are needed.
pub fn create_test_library() -> Result<(TempDir, PathBuf, PathBuf)> {
    let temp_dir = TempDir::new()?;
    let data_dir = temp_dir.path().join("data");
    std::fs::create_dir_all(data_dir.join("rock"))?;
    std::fs::create_dir_all(data_dir.join("jazz"))?;

    std::fs::write(
        data_dir.join("rock/first_album.txt"),
        format!(
            "artist:{BAND_ARTIST}\n\
             title:{OPENING_TRACK_TITLE}\n\
             album:First Album\n\
             track:1\n\
             genre:Rock\n\
             length:215\n\
             -\n\
             artist:{BAND_ARTIST}\n\
             title:{SECOND_SONG_TITLE}\n\
             album:First Album\n\
             track:2\n\
             genre:Rock\n\
             length:180\n\
             mood:happy\n\
             -\n"
        ),
    )?;

    write_gzip(
        &data_dir.join("jazz/collection.txt.gz"),
        &format!(
            "artist:{JAZZ_ARTIST}\n\
             title:{BLUE_NIGHT_TITLE}\n\
             album:Jazz Collection\n\
             track:1\n\
             genre:Jazz\n\
             modified:{BLUE_NIGHT_MODIFIED}\n\
             -\n\
             artist:{JAZZ_ARTIST}\n\
             title:{IMPROVISATION_TITLE}\n\
             track:x\n"
        ),
    )?;

    // Not matched by the default patterns
    std::fs::write(data_dir.join("README.md"), "artist:Nobody\n")?;

    let db_path = temp_dir.path().join("songdb.db");
    Ok((temp_dir, data_dir, db_path))
}

/// Adds a file with [`EXTRA_SONGS`] songs to an existing data directory
pub fn add_extra_file(data_dir: &Path) -> Result<PathBuf> {
    let path = data_dir.join("extra.txt");
    std::fs::write(
        &path,
        "artist:Late Arrival\ntitle:New One\n-\nartist:Late Arrival\ntitle:New Two\n",
    )?;
    Ok(path)
}

fn write_gzip(path: &Path, content: &str) -> Result<()> {
    let mut encoder = GzEncoder::new(std::fs::File::create(path)?, Compression::default());
    encoder.write_all(content.as_bytes())?;
    encoder.finish()?;
    Ok(())
}
