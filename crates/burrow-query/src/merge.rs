//! Merge algebra for clause categories.
//!
//! | category                         | rule                                   |
//! |----------------------------------|----------------------------------------|
//! | select, joins, group, order      | concatenate, drop later duplicates     |
//! | from, limit, offset              | last query with a value wins           |
//! | filter, having                   | parenthesize, join with AND / OR       |

use crate::ast::Predicate;
use crate::query::{push_unique, Clauses, Condition};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Merge `queries` under `predicate`.
///
/// A single input comes back unchanged; an empty slice yields empty clauses.
pub fn merge_clauses<C: Condition>(predicate: Predicate, queries: &[&Clauses<C>]) -> Clauses<C> {
    let mut merged = Clauses::<C>::default();

    for query in queries {
        push_unique(&mut merged.select, query.select.iter().cloned());
        push_unique(&mut merged.joins, query.joins.iter().cloned());
        push_unique(&mut merged.group, query.group.iter().cloned());
        push_unique(&mut merged.order, query.order.iter().cloned());

        if query.from.is_some() {
            merged.from.clone_from(&query.from);
        }
        if query.limit.is_some() {
            merged.limit = query.limit;
        }
        if query.offset.is_some() {
            merged.offset = query.offset;
        }
    }

    let filters: Vec<&C> = queries.iter().map(|query| &query.filter).collect();
    let havings: Vec<&C> = queries.iter().map(|query| &query.having).collect();
    merged.filter = C::combine(predicate, &filters);
    merged.having = C::combine(predicate, &havings);

    merged
}

// ============================================================================
// String expressions with positional binds
// ============================================================================

/// Condition list of raw expressions with `?` placeholders and their binds.
///
/// Binds are stored in the same left-to-right order as the placeholders
/// across all expressions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Expressions {
    exprs: Vec<String>,
    binds: Vec<Value>,
}

impl Expressions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(expr: impl Into<String>, binds: Vec<Value>) -> Self {
        Self {
            exprs: vec![expr.into()],
            binds,
        }
    }

    /// Add an expression; within one list entries are AND-ed together
    pub fn push(&mut self, expr: impl Into<String>, binds: impl IntoIterator<Item = Value>) {
        self.exprs.push(expr.into());
        self.binds.extend(binds);
    }

    pub fn exprs(&self) -> &[String] {
        &self.exprs
    }

    pub fn binds(&self) -> &[Value] {
        &self.binds
    }

    /// All entries as one expression: `a` or `(a) AND (b)`
    pub fn joined(&self) -> String {
        match self.exprs.as_slice() {
            [single] => single.clone(),
            exprs => join_parenthesized(exprs.iter(), " AND "),
        }
    }
}

fn join_parenthesized<'a>(exprs: impl Iterator<Item = &'a String>, separator: &str) -> String {
    exprs
        .map(|expr| format!("({expr})"))
        .collect::<Vec<_>>()
        .join(separator)
}

impl Condition for Expressions {
    fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    fn entries(&self) -> Vec<String> {
        self.exprs.clone()
    }

    fn combine(predicate: Predicate, parts: &[&Self]) -> Self {
        let parts: Vec<&Self> = parts.iter().copied().filter(|part| !part.is_empty()).collect();
        match parts.as_slice() {
            [] => Self::default(),
            [single] => (*single).clone(),
            parts => {
                let separator = match predicate {
                    Predicate::And => " AND ",
                    Predicate::Or => " OR ",
                };
                let joined: Vec<String> = parts.iter().map(|part| part.joined()).collect();
                Self {
                    exprs: vec![join_parenthesized(joined.iter(), separator)],
                    binds: parts.iter().flat_map(|part| part.binds.iter().cloned()).collect(),
                }
            }
        }
    }
}
