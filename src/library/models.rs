use crate::attributes::{AttributeCatalog, DisplayValue};
use crate::song_store::StoredSong;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// A song as returned to callers: its id and the attributes it actually has,
/// in catalog order, already converted to display form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongRow {
    pub id: i64,
    pub attributes: Vec<(&'static str, DisplayValue)>,
}

impl SongRow {
    /// Drops sentinel values so absent attributes are omitted.
    pub fn from_stored(catalog: &AttributeCatalog, song: &StoredSong) -> Self {
        let attributes = catalog
            .descriptors()
            .iter()
            .zip(&song.values)
            .filter(|(descriptor, value)| !descriptor.is_sentinel(value))
            .map(|(descriptor, value)| (descriptor.name, descriptor.display(value)))
            .collect();
        Self {
            id: song.id,
            attributes,
        }
    }

    pub fn get(&self, name: &str) -> Option<&DisplayValue> {
        self.attributes
            .iter()
            .find(|(attribute, _)| *attribute == name)
            .map(|(_, value)| value)
    }
}

impl Serialize for SongRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.attributes.len() + 1))?;
        map.serialize_entry("id", &self.id)?;
        for (name, value) in &self.attributes {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Library summary for the admin surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryInfo {
    /// Songs currently in the store.
    pub loaded: usize,
    /// Songs written by the last successful pass.
    pub found: usize,
    /// Warnings reported by the last successful pass.
    pub warnings: usize,
    #[serde(rename = "dbsize")]
    pub db_size_bytes: u64,
    pub last_reindex_failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reindex_error: Option<String>,
    pub last_reindex_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeValue;

    fn stored(catalog: &AttributeCatalog) -> StoredSong {
        let mut values: Vec<AttributeValue> =
            catalog.descriptors().iter().map(|d| d.sentinel()).collect();
        values[catalog.position("title").unwrap()] = AttributeValue::Text("Song A".to_string());
        values[catalog.position("track").unwrap()] = AttributeValue::Integer(7);
        values[catalog.position("modified").unwrap()] = AttributeValue::Integer(60);
        StoredSong {
            id: 12,
            values,
            file: "a.txt".to_string(),
        }
    }

    #[test]
    fn omits_sentinels_and_formats_dates() {
        let catalog = AttributeCatalog::standard();
        let row = SongRow::from_stored(&catalog, &stored(&catalog));

        assert_eq!(row.attributes.len(), 3);
        assert_eq!(row.get("album"), None);
        assert_eq!(row.get("track"), Some(&DisplayValue::Integer(7)));
        assert_eq!(
            row.get("modified"),
            Some(&DisplayValue::Text("1970-01-01 00:01:00".to_string()))
        );
    }

    #[test]
    fn serializes_as_flat_object() {
        let catalog = AttributeCatalog::standard();
        let row = SongRow::from_stored(&catalog, &stored(&catalog));
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 12,
                "track": 7,
                "title": "Song A",
                "modified": "1970-01-01 00:01:00"
            })
        );
    }
}
