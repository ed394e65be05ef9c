//! Turns compiled filter criteria into a parameterized predicate over the
//! flattened song view.
//!
//! Column names come from the attribute catalog only. Operands are always
//! bound as parameters.

use crate::attributes::{AttributeCatalog, AttributeValue, Operator, ValueError};
use crate::filter::Criterion;
use rusqlite::ToSql;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("invalid value in filter {clause}: {source}")]
    InvalidOperand {
        clause: String,
        #[source]
        source: ValueError,
    },

    #[error("unsupported filter: {0}")]
    UnsupportedCriterion(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Compare {
        column: &'static str,
        operator: Operator,
        value: AttributeValue,
    },
    /// The column holds a real value rather than the attribute's sentinel.
    NotSentinel {
        column: &'static str,
        sentinel: AttributeValue,
    },
    And(Vec<Predicate>),
}

impl Predicate {
    fn render(&self, sql: &mut String, params: &mut Vec<AttributeValue>) {
        match self {
            Predicate::Compare {
                column,
                operator,
                value,
            } => {
                sql.push_str(&format!("\"{}\" {} ?", column, operator.sql()));
                params.push(value.clone());
            }
            Predicate::NotSentinel { column, sentinel } => {
                sql.push_str(&format!("\"{}\" != ?", column));
                params.push(sentinel.clone());
            }
            Predicate::And(parts) => {
                sql.push('(');
                for (index, part) in parts.iter().enumerate() {
                    if index > 0 {
                        sql.push_str(" AND ");
                    }
                    part.render(sql, params);
                }
                sql.push(')');
            }
        }
    }
}

/// A rendered predicate and its parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    pub predicate: Predicate,
    pub where_sql: String,
    pub params: Vec<AttributeValue>,
}

impl BuiltQuery {
    pub fn param_refs(&self) -> Vec<&dyn ToSql> {
        self.params.iter().map(|p| p as &dyn ToSql).collect()
    }
}

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    catalog: Arc<AttributeCatalog>,
}

impl QueryBuilder {
    pub fn new(catalog: Arc<AttributeCatalog>) -> Self {
        Self { catalog }
    }

    /// Builds the predicate for `criteria`. Criteria on the same attribute
    /// are AND-ed together with a guard excluding the sentinel, and groups
    /// are AND-ed with each other in catalog order.
    ///
    /// Returns `None` for an empty criteria set: no filter means no results.
    pub fn build(&self, criteria: &BTreeSet<Criterion>) -> Result<Option<BuiltQuery>, QueryError> {
        if criteria.is_empty() {
            return Ok(None);
        }
        if let Some(unknown) = criteria
            .iter()
            .find(|c| self.catalog.lookup(c.attribute).is_none())
        {
            return Err(QueryError::UnsupportedCriterion(unknown.clause()));
        }

        let mut groups = Vec::new();
        for descriptor in self.catalog.descriptors() {
            let mut group = Vec::new();
            for criterion in criteria.iter().filter(|c| c.attribute == descriptor.name) {
                let operator = descriptor
                    .operator_for(criterion.suffix)
                    .ok_or_else(|| QueryError::UnsupportedCriterion(criterion.clause()))?;
                let value = descriptor
                    .coerce(criterion.suffix, &criterion.operand)
                    .ok_or_else(|| QueryError::UnsupportedCriterion(criterion.clause()))?
                    .map_err(|source| QueryError::InvalidOperand {
                        clause: criterion.clause(),
                        source,
                    })?;
                group.push(Predicate::Compare {
                    column: descriptor.name,
                    operator,
                    value,
                });
            }
            if group.is_empty() {
                continue;
            }
            groups.push(Predicate::And(vec![
                Predicate::And(group),
                Predicate::NotSentinel {
                    column: descriptor.name,
                    sentinel: descriptor.sentinel(),
                },
            ]));
        }

        let predicate = Predicate::And(groups);
        let mut where_sql = String::new();
        let mut params = Vec::new();
        predicate.render(&mut where_sql, &mut params);
        debug!("Filter predicate: {} {:?}", where_sql, params);

        Ok(Some(BuiltQuery {
            predicate,
            where_sql,
            params,
        }))
    }
}
