//! The fixed set of searchable song attributes.
//!
//! Every attribute has a storage kind, a set of filter suffixes mapped to
//! comparison operators, and a [`ValueCodec`] that knows how to turn raw file
//! text and filter operands into canonical storage values and back.

use super::value::{
    format_date, parse_date, parse_integer, wildcard_pattern, AttributeValue, DisplayValue,
    ValueError,
};
use anyhow::{bail, Result};
use std::collections::HashSet;

/// Column names that the store reserves for itself.
const RESERVED_NAMES: &[&str] = &["id", "file"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    Text,
    Integer,
}

impl StorageKind {
    pub fn sentinel(&self) -> AttributeValue {
        match self {
            StorageKind::Text => AttributeValue::Text(String::new()),
            StorageKind::Integer => AttributeValue::Integer(i64::MIN),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operator {
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
    PatternMatch,
    PatternNotMatch,
    CaseInsensitiveEquals,
}

impl Operator {
    /// SQL comparison placed between the column and its `?` placeholder.
    pub fn sql(&self) -> &'static str {
        match self {
            Operator::Equals => "=",
            Operator::NotEquals => "!=",
            Operator::LessThan => "<",
            Operator::GreaterThan => ">",
            Operator::PatternMatch => "LIKE",
            Operator::PatternNotMatch => "NOT LIKE",
            Operator::CaseInsensitiveEquals => "COLLATE NOCASE =",
        }
    }
}

/// Conversion rules between raw text, stored values and displayed values.
pub trait ValueCodec: Send + Sync {
    fn storage(&self) -> StorageKind;

    /// Raw file text to canonical storage form.
    fn normalize(&self, raw: &str) -> Result<AttributeValue, ValueError>;

    /// Stored value to the form returned to callers.
    fn display(&self, stored: &AttributeValue) -> DisplayValue;

    /// Filter operand to the query parameter bound for `operator`.
    fn coerce(&self, operator: Operator, operand: &str) -> Result<AttributeValue, ValueError>;
}

pub struct TextCodec;

impl ValueCodec for TextCodec {
    fn storage(&self) -> StorageKind {
        StorageKind::Text
    }

    fn normalize(&self, raw: &str) -> Result<AttributeValue, ValueError> {
        Ok(AttributeValue::Text(raw.trim().to_string()))
    }

    fn display(&self, stored: &AttributeValue) -> DisplayValue {
        match stored {
            AttributeValue::Text(s) => DisplayValue::Text(s.clone()),
            AttributeValue::Integer(i) => DisplayValue::Text(i.to_string()),
        }
    }

    fn coerce(&self, operator: Operator, operand: &str) -> Result<AttributeValue, ValueError> {
        match operator {
            Operator::PatternMatch | Operator::PatternNotMatch => {
                Ok(AttributeValue::Text(wildcard_pattern(operand)))
            }
            _ => Ok(AttributeValue::Text(operand.trim().to_string())),
        }
    }
}

pub struct IntegerCodec;

impl ValueCodec for IntegerCodec {
    fn storage(&self) -> StorageKind {
        StorageKind::Integer
    }

    fn normalize(&self, raw: &str) -> Result<AttributeValue, ValueError> {
        parse_integer(raw).map(AttributeValue::Integer)
    }

    fn display(&self, stored: &AttributeValue) -> DisplayValue {
        match stored {
            AttributeValue::Integer(i) => DisplayValue::Integer(*i),
            AttributeValue::Text(s) => DisplayValue::Text(s.clone()),
        }
    }

    fn coerce(&self, _operator: Operator, operand: &str) -> Result<AttributeValue, ValueError> {
        parse_integer(operand).map(AttributeValue::Integer)
    }
}

/// Timestamps, stored as epoch seconds.
pub struct DateCodec;

impl ValueCodec for DateCodec {
    fn storage(&self) -> StorageKind {
        StorageKind::Integer
    }

    fn normalize(&self, raw: &str) -> Result<AttributeValue, ValueError> {
        parse_date(raw).map(AttributeValue::Integer)
    }

    fn display(&self, stored: &AttributeValue) -> DisplayValue {
        match stored {
            AttributeValue::Integer(i) => DisplayValue::Text(format_date(*i)),
            AttributeValue::Text(s) => DisplayValue::Text(s.clone()),
        }
    }

    fn coerce(&self, _operator: Operator, operand: &str) -> Result<AttributeValue, ValueError> {
        parse_date(operand).map(AttributeValue::Integer)
    }
}

const TEXT_OPERATORS: &[(char, Operator)] = &[
    ('=', Operator::PatternMatch),
    ('~', Operator::PatternNotMatch),
    (':', Operator::CaseInsensitiveEquals),
];

const NUMERIC_OPERATORS: &[(char, Operator)] = &[
    ('=', Operator::Equals),
    ('<', Operator::LessThan),
    ('>', Operator::GreaterThan),
    ('~', Operator::NotEquals),
    (':', Operator::Equals),
];

/// Where an attribute's value comes from while indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// A `key:value` line in the file body.
    Content,
    /// Derived from the source file's name, ignoring the file body.
    FileName,
}

#[derive(Clone, Copy)]
pub struct AttributeDescriptor {
    pub name: &'static str,
    pub source: ValueSource,
    codec: &'static dyn ValueCodec,
    operators: &'static [(char, Operator)],
}

impl std::fmt::Debug for AttributeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeDescriptor")
            .field("name", &self.name)
            .field("storage", &self.storage())
            .field("source", &self.source)
            .finish()
    }
}

impl AttributeDescriptor {
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            source: ValueSource::Content,
            codec: &TextCodec,
            operators: TEXT_OPERATORS,
        }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            source: ValueSource::Content,
            codec: &IntegerCodec,
            operators: NUMERIC_OPERATORS,
        }
    }

    pub const fn date(name: &'static str) -> Self {
        Self {
            name,
            source: ValueSource::Content,
            codec: &DateCodec,
            operators: NUMERIC_OPERATORS,
        }
    }

    pub const fn from_file_name(mut self) -> Self {
        self.source = ValueSource::FileName;
        self
    }

    pub fn storage(&self) -> StorageKind {
        self.codec.storage()
    }

    pub fn suffixes(&self) -> impl Iterator<Item = char> + '_ {
        self.operators.iter().map(|(suffix, _)| *suffix)
    }

    pub fn operator_for(&self, suffix: char) -> Option<Operator> {
        self.operators
            .iter()
            .find(|(s, _)| *s == suffix)
            .map(|(_, operator)| *operator)
    }

    pub fn sentinel(&self) -> AttributeValue {
        self.storage().sentinel()
    }

    pub fn is_sentinel(&self, value: &AttributeValue) -> bool {
        *value == self.sentinel()
    }

    pub fn normalize(&self, raw: &str) -> Result<AttributeValue, ValueError> {
        self.codec.normalize(raw)
    }

    pub fn display(&self, stored: &AttributeValue) -> DisplayValue {
        self.codec.display(stored)
    }

    pub fn coerce(&self, suffix: char, operand: &str) -> Option<Result<AttributeValue, ValueError>> {
        self.operator_for(suffix)
            .map(|operator| self.codec.coerce(operator, operand))
    }
}

/// An attribute paired with one of its filter suffixes.
#[derive(Debug, Clone, Copy)]
pub struct SuffixedAttribute<'a> {
    pub descriptor: &'a AttributeDescriptor,
    pub suffix: char,
    pub operator: Operator,
}

const STANDARD_ATTRIBUTES: &[AttributeDescriptor] = &[
    AttributeDescriptor::text("media").from_file_name(),
    AttributeDescriptor::integer("track"),
    AttributeDescriptor::text("title"),
    AttributeDescriptor::integer("length"),
    AttributeDescriptor::text("artist"),
    AttributeDescriptor::text("albumartist"),
    AttributeDescriptor::text("composer"),
    AttributeDescriptor::text("performer"),
    AttributeDescriptor::text("album"),
    AttributeDescriptor::text("date"),
    AttributeDescriptor::text("genre"),
    AttributeDescriptor::text("codec"),
    AttributeDescriptor::integer("bitrate"),
    AttributeDescriptor::text("codecprofile"),
    AttributeDescriptor::integer("bitdepth"),
    AttributeDescriptor::integer("samplerate"),
    AttributeDescriptor::integer("channels"),
    AttributeDescriptor::text("tool"),
    AttributeDescriptor::text("comment"),
    AttributeDescriptor::text("note"),
    AttributeDescriptor::text("path"),
    AttributeDescriptor::date("modified"),
];

/// Immutable attribute table. Declaration order is significant: it is the
/// column order of the flattened song view.
#[derive(Debug, Clone)]
pub struct AttributeCatalog {
    descriptors: Vec<AttributeDescriptor>,
}

impl AttributeCatalog {
    /// The attribute set understood by song metadata files.
    pub fn standard() -> Self {
        Self {
            descriptors: STANDARD_ATTRIBUTES.to_vec(),
        }
    }

    /// Builds a catalog from custom descriptors. Names end up as SQL
    /// identifiers, so they are restricted to `[a-z0-9_]`.
    pub fn new(descriptors: Vec<AttributeDescriptor>) -> Result<Self> {
        if descriptors.is_empty() {
            bail!("Attribute catalog cannot be empty");
        }
        let mut seen = HashSet::new();
        for descriptor in &descriptors {
            let name = descriptor.name;
            let valid = !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
                && !name.starts_with(|c: char| c.is_ascii_digit());
            if !valid {
                bail!("Invalid attribute name '{}'", name);
            }
            if RESERVED_NAMES.contains(&name) {
                bail!("Attribute name '{}' is reserved", name);
            }
            if !seen.insert(name) {
                bail!("Duplicate attribute name '{}'", name);
            }
        }
        Ok(Self { descriptors })
    }

    pub fn descriptors(&self) -> &[AttributeDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn lookup(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.descriptors.iter().position(|d| d.name == name)
    }

    /// Resolves an exact `name+suffix` key such as `track>`.
    pub fn suffixed_lookup(&self, key: &str) -> Option<SuffixedAttribute<'_>> {
        let suffix = key.chars().last()?;
        let name = &key[..key.len() - suffix.len_utf8()];
        let descriptor = self.lookup(name)?;
        let operator = descriptor.operator_for(suffix)?;
        Some(SuffixedAttribute {
            descriptor,
            suffix,
            operator,
        })
    }

    /// Finds the attribute+suffix that prefixes `clause`, preferring the
    /// longest attribute name, and returns it with the remaining text.
    pub fn match_prefix<'c>(&self, clause: &'c str) -> Option<(SuffixedAttribute<'_>, &'c str)> {
        let mut best: Option<(SuffixedAttribute<'_>, &'c str)> = None;
        for descriptor in &self.descriptors {
            let Some(rest) = clause.strip_prefix(descriptor.name) else {
                continue;
            };
            let Some(suffix) = rest.chars().next() else {
                continue;
            };
            let Some(operator) = descriptor.operator_for(suffix) else {
                continue;
            };
            let longer = best
                .as_ref()
                .map_or(true, |(b, _)| descriptor.name.len() > b.descriptor.name.len());
            if longer {
                best = Some((
                    SuffixedAttribute {
                        descriptor,
                        suffix,
                        operator,
                    },
                    &rest[suffix.len_utf8()..],
                ));
            }
        }
        best
    }

    pub fn sorted_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.descriptors.iter().map(|d| d.name).collect();
        names.sort_unstable();
        names
    }
}

impl Default for AttributeCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_passes_validation() {
        let catalog = AttributeCatalog::new(STANDARD_ATTRIBUTES.to_vec()).unwrap();
        assert_eq!(catalog.len(), 22);
        assert_eq!(catalog.descriptors()[0].name, "media");
        assert_eq!(catalog.descriptors()[0].source, ValueSource::FileName);
    }

    #[test]
    fn rejects_reserved_and_duplicate_names() {
        assert!(AttributeCatalog::new(vec![AttributeDescriptor::text("id")]).is_err());
        assert!(AttributeCatalog::new(vec![
            AttributeDescriptor::text("title"),
            AttributeDescriptor::integer("title"),
        ])
        .is_err());
        assert!(AttributeCatalog::new(vec![AttributeDescriptor::text("drop table")]).is_err());
        assert!(AttributeCatalog::new(vec![]).is_err());
    }

    #[test]
    fn sentinels_follow_storage_kind() {
        let catalog = AttributeCatalog::standard();
        assert_eq!(
            catalog.lookup("title").unwrap().sentinel(),
            AttributeValue::Text(String::new())
        );
        assert_eq!(
            catalog.lookup("track").unwrap().sentinel(),
            AttributeValue::Integer(i64::MIN)
        );
        assert_eq!(
            catalog.lookup("modified").unwrap().sentinel(),
            AttributeValue::Integer(i64::MIN)
        );
    }

    #[test]
    fn suffixed_lookup_resolves_operator() {
        let catalog = AttributeCatalog::standard();

        let found = catalog.suffixed_lookup("track>").unwrap();
        assert_eq!(found.descriptor.name, "track");
        assert_eq!(found.operator, Operator::GreaterThan);

        let found = catalog.suffixed_lookup("title~").unwrap();
        assert_eq!(found.operator, Operator::PatternNotMatch);

        assert!(catalog.suffixed_lookup("title<").is_none());
        assert!(catalog.suffixed_lookup("nope=").is_none());
        assert!(catalog.suffixed_lookup("").is_none());
    }

    #[test]
    fn match_prefix_prefers_most_specific_name() {
        let catalog = AttributeCatalog::standard();

        let (found, rest) = catalog.match_prefix("albumartist=Various").unwrap();
        assert_eq!(found.descriptor.name, "albumartist");
        assert_eq!(found.suffix, '=');
        assert_eq!(rest, "Various");

        let (found, rest) = catalog.match_prefix("album:Abbey Road").unwrap();
        assert_eq!(found.descriptor.name, "album");
        assert_eq!(found.operator, Operator::CaseInsensitiveEquals);
        assert_eq!(rest, "Abbey Road");

        let (found, _) = catalog.match_prefix("codecprofile=lossless").unwrap();
        assert_eq!(found.descriptor.name, "codecprofile");
    }

    #[test]
    fn match_prefix_prefers_longer_name_regardless_of_order() {
        let catalog = AttributeCatalog::new(vec![
            AttributeDescriptor::text("tag"),
            AttributeDescriptor::text("tag_x"),
        ])
        .unwrap();
        let custom = AttributeCatalog::new(vec![
            AttributeDescriptor::text("tag_x"),
            AttributeDescriptor::text("tag"),
        ])
        .unwrap();

        for c in [&catalog, &custom] {
            let (found, rest) = c.match_prefix("tag_x=1").unwrap();
            assert_eq!(found.descriptor.name, "tag_x");
            assert_eq!(rest, "1");
        }
    }

    #[test]
    fn match_prefix_requires_supported_suffix() {
        let catalog = AttributeCatalog::standard();
        assert!(catalog.match_prefix("title>5").is_none());
        assert!(catalog.match_prefix("unknown=5").is_none());
        assert!(catalog.match_prefix("title").is_none());
    }

    #[test]
    fn coercion_per_suffix() {
        let catalog = AttributeCatalog::standard();
        let title = catalog.lookup("title").unwrap();
        assert_eq!(
            title.coerce('=', " dark side "),
            Some(Ok(AttributeValue::Text("%dark%side%".to_string())))
        );
        assert_eq!(
            title.coerce(':', " Money "),
            Some(Ok(AttributeValue::Text("Money".to_string())))
        );
        assert!(title.coerce('<', "x").is_none());

        let modified = catalog.lookup("modified").unwrap();
        assert_eq!(
            modified.coerce('>', "1970-01-01 00:00:10"),
            Some(Ok(AttributeValue::Integer(10)))
        );
        assert!(matches!(
            modified.coerce('>', "yesterday"),
            Some(Err(ValueError::InvalidDate(_)))
        ));
    }

    #[test]
    fn date_normalize_and_display_are_inverse() {
        let modified = AttributeCatalog::standard().lookup("modified").copied().unwrap();
        let stored = modified.normalize("2016-11-02 08:15:00").unwrap();
        assert_eq!(
            modified.display(&stored),
            DisplayValue::Text("2016-11-02 08:15:00".to_string())
        );
        assert_eq!(
            modified.coerce('=', "2016-11-02 08:15:00"),
            Some(Ok(stored))
        );
    }

    #[test]
    fn sorted_names() {
        let names = AttributeCatalog::standard().sorted_names();
        assert_eq!(names.first(), Some(&"album"));
        assert_eq!(names.last(), Some(&"tool"));
        assert!(names.windows(2).all(|w| w[0] < w[1]));
    }
}
