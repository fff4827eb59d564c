//! Matchers decide which rule runs for which term.

use crate::compiler::Compiler;
use crate::query::Query;
use crate::term::MatchedTerm;
use std::fmt;
use std::sync::Arc;

/// Guard closure evaluated against the compiler and the current term
pub type GuardFn<Q> = Arc<dyn Fn(&Compiler<Q>, &MatchedTerm) -> bool + Send + Sync>;

/// An `if`/`unless` guard: a named condition or an inline closure.
pub enum Guard<Q: Query> {
    Named(String),
    Inline(GuardFn<Q>),
}

impl<Q: Query> Guard<Q> {
    /// Refer to a condition registered on the definition
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn inline<F>(f: F) -> Self
    where
        F: Fn(&Compiler<Q>, &MatchedTerm) -> bool + Send + Sync + 'static,
    {
        Self::Inline(Arc::new(f))
    }
}

impl<Q: Query> Clone for Guard<Q> {
    fn clone(&self) -> Self {
        match self {
            Self::Named(name) => Self::Named(name.clone()),
            Self::Inline(f) => Self::Inline(Arc::clone(f)),
        }
    }
}

impl<Q: Query> fmt::Debug for Guard<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Inline(_) => f.write_str("Inline(..)"),
        }
    }
}

// ============================================================================
// Field filter
// ============================================================================

/// Which fields a matcher accepts.
///
/// Empty accepts every term. `None` entries accept fieldless terms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldFilter {
    fields: Vec<Option<String>>,
}

impl FieldFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn only<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(|f| Some(f.into())).collect(),
        }
    }

    pub fn fieldless() -> Self {
        Self { fields: vec![None] }
    }

    pub fn push(&mut self, field: Option<String>) {
        if !self.fields.contains(&field) {
            self.fields.push(field);
        }
    }

    pub fn is_any(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn allows(&self, field: Option<&str>) -> bool {
        self.is_any() || self.fields.iter().any(|allowed| allowed.as_deref() == field)
    }
}

// ============================================================================
// Options
// ============================================================================

/// Options for [`match_rule`](crate::definition::DefinitionBuilder::match_rule).
pub struct MatchOptions<Q: Query> {
    pub(crate) fields: FieldFilter,
    pub(crate) rank: i64,
    pub(crate) when: Option<Guard<Q>>,
    pub(crate) unless: Option<Guard<Q>>,
}

impl<Q: Query> Default for MatchOptions<Q> {
    fn default() -> Self {
        Self {
            fields: FieldFilter::any(),
            rank: 0,
            when: None,
            unless: None,
        }
    }
}

impl<Q: Query> Clone for MatchOptions<Q> {
    fn clone(&self) -> Self {
        Self {
            fields: self.fields.clone(),
            rank: self.rank,
            when: self.when.clone(),
            unless: self.unless.clone(),
        }
    }
}

impl<Q: Query> MatchOptions<Q> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(Some(field.into()));
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for field in fields {
            self.fields.push(Some(field.into()));
        }
        self
    }

    /// Also accept terms with no field
    pub fn fieldless(mut self) -> Self {
        self.fields.push(None);
        self
    }

    /// Lower ranks run first
    pub fn rank(mut self, rank: i64) -> Self {
        self.rank = rank;
        self
    }

    /// Run only when `guard` holds
    pub fn when(mut self, guard: Guard<Q>) -> Self {
        self.when = Some(guard);
        self
    }

    /// Skip when `guard` holds
    pub fn unless(mut self, guard: Guard<Q>) -> Self {
        self.unless = Some(guard);
        self
    }
}

// ============================================================================
// Resolved matcher
// ============================================================================

/// A matcher with its guards resolved against the definition's conditions.
pub struct Matcher<Q: Query> {
    rule: String,
    rank: i64,
    fields: FieldFilter,
    when: Option<GuardFn<Q>>,
    unless: Option<GuardFn<Q>>,
}

impl<Q: Query> Matcher<Q> {
    pub(crate) fn new(
        rule: String,
        rank: i64,
        fields: FieldFilter,
        when: Option<GuardFn<Q>>,
        unless: Option<GuardFn<Q>>,
    ) -> Self {
        Self {
            rule,
            rank,
            fields,
            when,
            unless,
        }
    }

    pub fn rule(&self) -> &str {
        &self.rule
    }

    pub fn rank(&self) -> i64 {
        self.rank
    }

    pub fn fields(&self) -> &FieldFilter {
        &self.fields
    }

    /// Guards first, then the field filter against the (possibly aliased) field
    pub fn matches(&self, compiler: &Compiler<Q>, term: &MatchedTerm) -> bool {
        if let Some(when) = &self.when {
            if !when(compiler, term) {
                return false;
            }
        }
        if let Some(unless) = &self.unless {
            if unless(compiler, term) {
                return false;
            }
        }
        self.fields.allows(term.field())
    }
}

impl<Q: Query> fmt::Debug for Matcher<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matcher")
            .field("rule", &self.rule)
            .field("rank", &self.rank)
            .field("fields", &self.fields)
            .field("when", &self.when.is_some())
            .field("unless", &self.unless.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(FieldFilter::any(), Some("name"), true ; "any accepts fielded")]
    #[test_case(FieldFilter::any(), None, true ; "any accepts fieldless")]
    #[test_case(FieldFilter::only(["name"]), Some("name"), true ; "listed field")]
    #[test_case(FieldFilter::only(["name"]), Some("age"), false ; "unlisted field")]
    #[test_case(FieldFilter::only(["name"]), None, false ; "fieldless rejected")]
    #[test_case(FieldFilter::fieldless(), None, true ; "fieldless marker")]
    #[test_case(FieldFilter::fieldless(), Some("name"), false ; "fieldless marker rejects fielded")]
    fn test_field_filter(filter: FieldFilter, field: Option<&str>, expected: bool) {
        assert_eq!(filter.allows(field), expected);
    }

    #[test]
    fn test_field_filter_dedups() {
        let mut filter = FieldFilter::only(["name"]);
        filter.push(Some("name".into()));
        filter.push(None);
        filter.push(None);
        assert_eq!(filter, FieldFilter { fields: vec![Some("name".into()), None] });
    }
}
