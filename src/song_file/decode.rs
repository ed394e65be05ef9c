use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

const GZIP_SUFFIX: &str = ".gz";
const TEXT_SUFFIX: &str = ".txt";

/// Character encoding of song metadata files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceEncoding {
    #[default]
    Utf8,
    Latin1,
}

impl FromStr for SourceEncoding {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(SourceEncoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" => Ok(SourceEncoding::Latin1),
            other => bail!("Unsupported encoding '{}'", other),
        }
    }
}

impl fmt::Display for SourceEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceEncoding::Utf8 => write!(f, "utf-8"),
            SourceEncoding::Latin1 => write!(f, "latin-1"),
        }
    }
}

impl SourceEncoding {
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            SourceEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            // Every latin-1 byte is the code point of the same value.
            SourceEncoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

/// Reads a metadata file, inflating it in memory when it is gzip-compressed.
pub fn read_source_file(path: &Path, encoding: SourceEncoding) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut bytes = Vec::new();
    if is_gzip(path) {
        GzDecoder::new(file)
            .read_to_end(&mut bytes)
            .with_context(|| format!("Failed to decompress {}", path.display()))?;
    } else {
        file.read_to_end(&mut bytes)
            .with_context(|| format!("Failed to read {}", path.display()))?;
    }
    Ok(encoding.decode(&bytes))
}

fn is_gzip(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(GZIP_SUFFIX))
}

/// Derives the `media` attribute from a file name: `disc1.txt.gz` -> `disc1`.
pub fn media_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = name.strip_suffix(GZIP_SUFFIX).unwrap_or(&name);
    let name = name.strip_suffix(TEXT_SUFFIX).unwrap_or(name);
    name.to_string()
}
