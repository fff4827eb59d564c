//! Scoped builders handed to rule bodies.
//!
//! A rule body never touches a query directly. It calls monadic operations
//! through a [`Scope`], which swaps in the returned query value. Backends
//! list their operations in extension traits blanket-implemented over
//! `Scope<TheirQuery>`, so only those operations can change the state.

use crate::ast::Predicate;
use crate::error::{QueryError, QueryResult};
use crate::query::Query;
use crate::term::MatchedTerm;
use std::ops::Deref;
use tracing::trace;

/// Chainable access to an in-progress query.
pub trait Scope<Q: Query> {
    /// Apply a monadic operation to the current query
    fn apply<F>(&mut self, op: F) -> QueryResult<&mut Self>
    where
        F: FnOnce(&Q) -> QueryResult<Q>;

    /// Read the current query without changing anything
    fn current(&self) -> &Q;

    /// Whether the term being compiled was negated
    fn is_negated(&self) -> bool;

    /// Add an already-built sub-query
    fn push(&mut self, query: Q) -> &mut Self;

    /// Compare the term's own field against its value
    fn compare(&mut self, term: &MatchedTerm) -> QueryResult<&mut Self> {
        let field = term
            .field()
            .ok_or_else(|| QueryError::MissingField {
                term: term.to_string(),
            })?
            .to_string();
        self.compare_field(&field, term)
    }

    /// Compare `field` against the term's operator and value
    fn compare_field(&mut self, field: &str, term: &MatchedTerm) -> QueryResult<&mut Self> {
        self.apply(|query| query.compare(field, term.operator(), term.value()))
    }

    /// Branches built in `block` merged under `or` (`and` when negated)
    fn any_of<F>(&mut self, block: F) -> QueryResult<&mut Self>
    where
        F: FnOnce(&mut MergingBuilder<Q>) -> QueryResult<()>,
    {
        let predicate = if self.is_negated() {
            Predicate::And
        } else {
            Predicate::Or
        };
        self.grouped(predicate, block)
    }

    /// Branches built in `block` merged under `and` (`or` when negated)
    fn all_of<F>(&mut self, block: F) -> QueryResult<&mut Self>
    where
        F: FnOnce(&mut MergingBuilder<Q>) -> QueryResult<()>,
    {
        let predicate = if self.is_negated() {
            Predicate::Or
        } else {
            Predicate::And
        };
        self.grouped(predicate, block)
    }

    /// Run `block` against a merging builder rooted at a cleared copy of the
    /// current query, then push the merged branches as one sub-query.
    fn grouped<F>(&mut self, predicate: Predicate, block: F) -> QueryResult<&mut Self>
    where
        F: FnOnce(&mut MergingBuilder<Q>) -> QueryResult<()>,
    {
        let mut branches = MergingBuilder::new(self.current().cleared(), self.is_negated());
        block(&mut branches)?;
        trace!(
            predicate = %predicate,
            branches = branches.branches().len(),
            "merging grouped branches"
        );
        if let Some(merged) = branches.merged(predicate) {
            self.push(merged);
        }
        Ok(self)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Single-state scope used for one rule application.
#[derive(Debug, Clone)]
pub struct Builder<Q> {
    state: Q,
    negated: bool,
    touched: bool,
}

impl<Q: Query> Builder<Q> {
    pub fn new(state: Q, negated: bool) -> Self {
        Self {
            state,
            negated,
            touched: false,
        }
    }

    /// True once a monadic operation or push has run
    pub fn is_touched(&self) -> bool {
        self.touched
    }

    pub fn result(&self) -> &Q {
        &self.state
    }

    pub fn into_result(self) -> Q {
        self.state
    }
}

impl<Q: Query> Scope<Q> for Builder<Q> {
    fn apply<F>(&mut self, op: F) -> QueryResult<&mut Self>
    where
        F: FnOnce(&Q) -> QueryResult<Q>,
    {
        self.state = op(&self.state)?;
        self.touched = true;
        Ok(self)
    }

    fn current(&self) -> &Q {
        &self.state
    }

    fn is_negated(&self) -> bool {
        self.negated
    }

    fn push(&mut self, query: Q) -> &mut Self {
        self.state = self.state.merge(Predicate::And, std::slice::from_ref(&query));
        self.touched = true;
        self
    }
}

impl<Q> Deref for Builder<Q> {
    type Target = Q;

    fn deref(&self) -> &Q {
        &self.state
    }
}

// ============================================================================
// MergingBuilder
// ============================================================================

/// Scope where every operation starts a new branch from the same root.
#[derive(Debug, Clone)]
pub struct MergingBuilder<Q> {
    root: Q,
    branches: Vec<Q>,
    negated: bool,
}

impl<Q: Query> MergingBuilder<Q> {
    pub fn new(root: Q, negated: bool) -> Self {
        Self {
            root,
            branches: Vec::new(),
            negated,
        }
    }

    pub fn branches(&self) -> &[Q] {
        &self.branches
    }

    /// Merge the branches under `predicate`; the root when there are none
    pub fn merge(&self, predicate: Predicate) -> Q {
        self.merged(predicate).unwrap_or_else(|| self.root.clone())
    }

    fn merged(&self, predicate: Predicate) -> Option<Q> {
        let (first, rest) = self.branches.split_first()?;
        Some(first.merge(predicate, rest))
    }
}

impl<Q: Query> Scope<Q> for MergingBuilder<Q> {
    fn apply<F>(&mut self, op: F) -> QueryResult<&mut Self>
    where
        F: FnOnce(&Q) -> QueryResult<Q>,
    {
        let branch = op(&self.root)?;
        self.branches.push(branch);
        Ok(self)
    }

    fn current(&self) -> &Q {
        &self.root
    }

    fn is_negated(&self) -> bool {
        self.negated
    }

    fn push(&mut self, query: Q) -> &mut Self {
        self.branches.push(query);
        self
    }
}
