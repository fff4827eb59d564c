//! The query capability backends implement, and the clause model they share.

use crate::ast::{Operator, Predicate};
use crate::error::{QueryError, QueryResult};
use std::fmt;

// ============================================================================
// Capabilities
// ============================================================================

/// An immutable query value.
///
/// Every operation returns a new value; nothing mutates in place. Backends
/// add their own monadic operations through extension traits over
/// [`Scope`](crate::builder::Scope).
pub trait Query: Clone + fmt::Debug + Send + Sync + 'static {
    /// Constrain `field` by `operator` and `value`
    fn compare(&self, field: &str, operator: Operator, value: &str) -> QueryResult<Self>;

    /// Combine this query with `others` under `predicate`.
    ///
    /// With no `others` this returns a fresh copy of `self`.
    fn merge(&self, predicate: Predicate, others: &[Self]) -> Self;

    /// Copy with the predicate-combined categories emptied
    fn cleared(&self) -> Self;

    /// Stable rendering used for equivalence and debugging
    fn render(&self) -> String;

    /// Structural equivalence: same rendering
    fn equivalent(&self, other: &Self) -> bool {
        self.render() == other.render()
    }
}

/// Execution side of a query.
pub trait Results: Query {
    type Row;
    type Error: std::error::Error;

    fn rows(&self) -> Result<Vec<Self::Row>, Self::Error>;

    fn count(&self) -> Result<usize, Self::Error>;

    fn is_empty(&self) -> Result<bool, Self::Error> {
        Ok(self.count()? == 0)
    }
}

/// A predicate-combined clause category (`filter`, `having`).
pub trait Condition: Clone + fmt::Debug + Default + PartialEq + Send + Sync + 'static {
    fn is_empty(&self) -> bool;

    /// Rendered entries, one per condition
    fn entries(&self) -> Vec<String>;

    /// Combine `parts` under `predicate`. Empty parts are skipped and a
    /// single non-empty part is returned unchanged.
    fn combine(predicate: Predicate, parts: &[&Self]) -> Self;
}

// ============================================================================
// Clause model
// ============================================================================

/// Clause categories and how each behaves under merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseKind {
    Select,
    From,
    Joins,
    Filter,
    Having,
    Group,
    Order,
    Limit,
    Offset,
}

/// How a clause category merges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeRule {
    /// Concatenate in query order, dropping later duplicates
    Accumulate,
    /// The last query with a value wins
    LastWins,
    /// Parenthesize and join under the merge predicate
    Combine,
}

impl ClauseKind {
    pub const ALL: [ClauseKind; 9] = [
        Self::Select,
        Self::From,
        Self::Joins,
        Self::Filter,
        Self::Having,
        Self::Group,
        Self::Order,
        Self::Limit,
        Self::Offset,
    ];

    /// Look up a category by name; `where` is accepted for `filter`
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "select" => Some(Self::Select),
            "from" => Some(Self::From),
            "joins" | "includes" => Some(Self::Joins),
            "filter" | "where" => Some(Self::Filter),
            "having" => Some(Self::Having),
            "group" => Some(Self::Group),
            "order" => Some(Self::Order),
            "limit" => Some(Self::Limit),
            "offset" => Some(Self::Offset),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::From => "from",
            Self::Joins => "joins",
            Self::Filter => "filter",
            Self::Having => "having",
            Self::Group => "group",
            Self::Order => "order",
            Self::Limit => "limit",
            Self::Offset => "offset",
        }
    }

    pub fn merge_rule(self) -> MergeRule {
        match self {
            Self::Select | Self::Joins | Self::Group | Self::Order => MergeRule::Accumulate,
            Self::From | Self::Limit | Self::Offset => MergeRule::LastWins,
            Self::Filter | Self::Having => MergeRule::Combine,
        }
    }
}

/// Borrowed view of one clause category.
#[derive(Debug, Clone, PartialEq)]
pub enum ClauseValue<'a> {
    List(&'a [String]),
    Source(Option<&'a str>),
    Count(Option<u64>),
    Conditions(Vec<String>),
}

/// Clause categories of a query, generic over the condition representation.
#[derive(Debug, Clone, PartialEq)]
pub struct Clauses<C> {
    pub select: Vec<String>,
    pub joins: Vec<String>,
    pub group: Vec<String>,
    pub order: Vec<String>,
    pub from: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub filter: C,
    pub having: C,
}

impl<C: Default> Default for Clauses<C> {
    fn default() -> Self {
        Self {
            select: Vec::new(),
            joins: Vec::new(),
            group: Vec::new(),
            order: Vec::new(),
            from: None,
            limit: None,
            offset: None,
            filter: C::default(),
            having: C::default(),
        }
    }
}

impl<C: Condition> Clauses<C> {
    /// Inspect a clause by name.
    ///
    /// `query_type` names the owning query in the error for unknown names.
    pub fn clause(&self, name: &str, query_type: &str) -> QueryResult<ClauseValue<'_>> {
        let kind = ClauseKind::from_name(name).ok_or_else(|| QueryError::NoSuchClause {
            clause: name.to_string(),
            query_type: query_type.to_string(),
        })?;
        Ok(match kind {
            ClauseKind::Select => ClauseValue::List(&self.select),
            ClauseKind::Joins => ClauseValue::List(&self.joins),
            ClauseKind::Group => ClauseValue::List(&self.group),
            ClauseKind::Order => ClauseValue::List(&self.order),
            ClauseKind::From => ClauseValue::Source(self.from.as_deref()),
            ClauseKind::Limit => ClauseValue::Count(self.limit),
            ClauseKind::Offset => ClauseValue::Count(self.offset),
            ClauseKind::Filter => ClauseValue::Conditions(self.filter.entries()),
            ClauseKind::Having => ClauseValue::Conditions(self.having.entries()),
        })
    }

    /// Copy with `filter` and `having` emptied
    pub fn cleared(&self) -> Self {
        Self {
            filter: C::default(),
            having: C::default(),
            ..self.clone()
        }
    }
}

/// Append items not already present, keeping first-seen order
pub fn push_unique<I, S>(list: &mut Vec<String>, items: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    for item in items {
        let item = item.into();
        if !list.contains(&item) {
            list.push(item);
        }
    }
}
