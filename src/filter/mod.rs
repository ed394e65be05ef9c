//! Compiler for the line-oriented filter language.
//!
//! Each non-blank line is a clause of the form `@<attribute><suffix><operand>`,
//! for example `@artist=pink floyd` or `@track>3`. Clauses with an empty
//! operand are accepted and ignored.

use crate::attributes::AttributeCatalog;
use std::collections::BTreeSet;
use thiserror::Error;

pub const CLAUSE_PREFIX: char = '@';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("filter must start with @: {0}")]
    MissingPrefix(String),

    #[error("unknown filter: {0}")]
    UnknownFilter(String),
}

/// One compiled clause. The operand is trimmed but otherwise raw; coercion
/// happens when the query is built.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Criterion {
    pub attribute: &'static str,
    pub suffix: char,
    pub operand: String,
}

impl Criterion {
    /// The clause this criterion was compiled from, minus surrounding blanks.
    pub fn clause(&self) -> String {
        format!(
            "{}{}{}{}",
            CLAUSE_PREFIX, self.attribute, self.suffix, self.operand
        )
    }
}

pub fn compile_filter(
    catalog: &AttributeCatalog,
    text: &str,
) -> Result<BTreeSet<Criterion>, FilterError> {
    let mut criteria = BTreeSet::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some(body) = line.strip_prefix(CLAUSE_PREFIX) else {
            return Err(FilterError::MissingPrefix(line.to_string()));
        };
        let Some((matched, operand)) = catalog.match_prefix(body) else {
            return Err(FilterError::UnknownFilter(line.to_string()));
        };
        let operand = operand.trim();
        if operand.is_empty() {
            continue;
        }
        criteria.insert(Criterion {
            attribute: matched.descriptor.name,
            suffix: matched.suffix,
            operand: operand.to_string(),
        });
    }
    Ok(criteria)
}
