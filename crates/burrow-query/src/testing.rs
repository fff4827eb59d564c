//! Test utilities.
//!
//! `MockQuery` renders everything as a compact string so compiler behaviour
//! can be asserted without a storage backend:
//!
//! ```text
//! name:eq:alice              one comparison
//! (or name:eq:a name:eq:b)   merged sub-queries
//! ```

use crate::ast::{Operator, Predicate};
use crate::builder::Scope;
use crate::error::QueryResult;
use crate::query::Query;
use std::fmt;

/// String-rendering query for tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockQuery {
    condition: String,
}

impl MockQuery {
    pub fn new(condition: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
        }
    }

    /// Append `text` to the condition, space-separated
    pub fn with_condition(&self, text: impl fmt::Display) -> Self {
        let text = text.to_string();
        let condition = if self.condition.is_empty() {
            text
        } else {
            format!("{} {text}", self.condition)
        };
        Self { condition }
    }

    pub fn as_str(&self) -> &str {
        &self.condition
    }
}

impl Query for MockQuery {
    fn compare(&self, field: &str, operator: Operator, value: &str) -> QueryResult<Self> {
        Ok(self.with_condition(format!("{field}:{operator}:{value}")))
    }

    fn merge(&self, predicate: Predicate, others: &[Self]) -> Self {
        if others.is_empty() {
            return self.clone();
        }
        let parts: Vec<&str> = std::iter::once(self)
            .chain(others)
            .map(MockQuery::as_str)
            .filter(|part| !part.is_empty())
            .collect();
        match parts.as_slice() {
            [] => Self::default(),
            [single] => Self::new(*single),
            parts => Self::new(format!("({predicate} {})", parts.join(" "))),
        }
    }

    fn cleared(&self) -> Self {
        Self::default()
    }

    fn render(&self) -> String {
        self.condition.clone()
    }
}

impl fmt::Display for MockQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.condition)
    }
}

/// Monadic operations of [`MockQuery`].
pub trait MockMethods: Scope<MockQuery> {
    fn condition(&mut self, text: impl fmt::Display) -> QueryResult<&mut Self> {
        self.apply(|query| Ok(query.with_condition(text)))
    }
}

impl<S: Scope<MockQuery>> MockMethods for S {}
