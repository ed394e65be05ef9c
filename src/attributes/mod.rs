mod catalog;
mod value;

pub use catalog::{
    AttributeCatalog, AttributeDescriptor, DateCodec, IntegerCodec, Operator, StorageKind,
    SuffixedAttribute, TextCodec, ValueCodec, ValueSource,
};
pub use value::{
    format_date, parse_date, parse_integer, wildcard_pattern, AttributeValue, DisplayValue,
    ValueError, DATE_FORMAT,
};
