use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// A metadata file found under the data directory.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredFile {
    /// Path relative to the data directory, `/`-separated.
    pub relative_path: String,
    pub absolute_path: PathBuf,
    /// Modification time in fractional seconds since the Unix epoch.
    pub mtime: f64,
}

/// File-name patterns selecting which files get indexed.
#[derive(Debug, Clone)]
pub struct FileMatcher {
    set: GlobSet,
}

impl FileMatcher {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            builder.add(
                Glob::new(pattern).with_context(|| format!("Invalid file pattern '{}'", pattern))?,
            );
        }
        Ok(Self {
            set: builder.build()?,
        })
    }

    /// Matches against the file name only, never the directory part.
    pub fn is_match(&self, path: &Path) -> bool {
        path.file_name().is_some_and(|name| self.set.is_match(name))
    }
}

/// Recursively lists files under `root` accepted by `matcher`, sorted by
/// relative path.
///
/// Symlinked directories are not descended into. Symlinks to regular files
/// are listed like the files themselves.
pub fn discover_files(root: &Path, matcher: &FileMatcher) -> Result<Vec<DiscoveredFile>> {
    let mut results = Vec::new();
    for entry in WalkDir::new(root) {
        let entry =
            entry.with_context(|| format!("Failed to walk data directory {}", root.display()))?;
        let is_file = entry.file_type().is_file()
            || (entry.path_is_symlink() && entry.path().is_file());
        if !is_file || !matcher.is_match(entry.path()) {
            continue;
        }
        let relative_path = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let mtime = std::fs::metadata(entry.path())
            .with_context(|| format!("Failed to stat {}", entry.path().display()))?
            .modified()
            .unwrap_or(SystemTime::UNIX_EPOCH)
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        results.push(DiscoveredFile {
            relative_path,
            absolute_path: entry.path().to_path_buf(),
            mtime,
        });
    }
    results.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(results)
}
