use crate::attributes::{AttributeCatalog, ValueSource};
use std::collections::HashMap;
use std::str::Lines;
use tracing::warn;

pub const RECORD_DELIMITER: &str = "-";
const BYTE_ORDER_MARK: char = '\u{feff}';

/// Raw `key -> value` map of one song entry, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub fields: HashMap<&'static str, String>,
}

impl RawRecord {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|s| s.as_str())
    }
}

/// Lazily splits the text of one metadata file into song records.
///
/// Records are separated by a line holding only `-`; the text after the last
/// separator forms a final record. Keys are matched against the catalog and
/// unknown ones are logged and counted in [`RecordReader::warnings`].
/// Attributes sourced from the file name always get `media_name`.
pub struct RecordReader<'a> {
    lines: Lines<'a>,
    catalog: &'a AttributeCatalog,
    media_name: &'a str,
    source_label: &'a str,
    warnings: usize,
    finished: bool,
}

impl<'a> RecordReader<'a> {
    pub fn new(
        text: &'a str,
        catalog: &'a AttributeCatalog,
        media_name: &'a str,
        source_label: &'a str,
    ) -> Self {
        Self {
            lines: text.lines(),
            catalog,
            media_name,
            source_label,
            warnings: 0,
            finished: false,
        }
    }

    pub fn warnings(&self) -> usize {
        self.warnings
    }

    fn finish_record(&self, mut record: RawRecord) -> Option<RawRecord> {
        if record.fields.is_empty() {
            return None;
        }
        for descriptor in self.catalog.descriptors() {
            if descriptor.source == ValueSource::FileName {
                record
                    .fields
                    .insert(descriptor.name, self.media_name.to_string());
            }
        }
        Some(record)
    }
}

fn clean_line(line: &str) -> &str {
    line.trim().trim_matches(BYTE_ORDER_MARK).trim()
}

impl Iterator for RecordReader<'_> {
    type Item = RawRecord;

    fn next(&mut self) -> Option<RawRecord> {
        if self.finished {
            return None;
        }
        let mut record = RawRecord::default();
        loop {
            let Some(line) = self.lines.next() else {
                self.finished = true;
                return self.finish_record(record);
            };
            let line = clean_line(line);
            if line.is_empty() {
                continue;
            }
            let (key, value) = match line.split_once(':') {
                Some((key, value)) => (key, Some(value)),
                None => (line, None),
            };
            if key == RECORD_DELIMITER {
                if let Some(done) = self.finish_record(std::mem::take(&mut record)) {
                    return Some(done);
                }
                continue;
            }
            if key.is_empty() {
                continue;
            }
            match (self.catalog.lookup(key), value) {
                (Some(descriptor), Some(value)) => {
                    if descriptor.source == ValueSource::Content {
                        record.fields.insert(descriptor.name, value.to_string());
                    }
                }
                _ => {
                    warn!("Unknown key in file ({}): {}", self.source_label, line);
                    self.warnings += 1;
                }
            }
        }
    }
}
