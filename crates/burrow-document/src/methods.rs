//! Monadic operations rule bodies may call on a document scope.

use crate::query::DocumentQuery;
use crate::selector::Selector;
use burrow_query::{push_unique, QueryResult, Scope};
use serde_json::Value;

/// Whitelisted operations of [`DocumentQuery`], available on every
/// `Scope<DocumentQuery>`.
pub trait DocumentMethods: Scope<DocumentQuery> {
    /// AND a raw selector document into the filter
    fn filter(&mut self, selector: Value) -> QueryResult<&mut Self> {
        let selector = Selector::parse(selector)?;
        self.apply(|query| Ok(query.and_selector(&selector)))
    }

    fn filter_eq(&mut self, field: &str, value: impl Into<Value>) -> QueryResult<&mut Self> {
        let selector = Selector::field(field, value.into());
        self.apply(|query| Ok(query.and_selector(&selector)))
    }

    /// Project results onto these (dotted) paths
    fn select<I, S>(&mut self, fields: I) -> QueryResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.apply(|query| Ok(query.with_clauses(|c| push_unique(&mut c.select, fields))))
    }

    /// Add a sort key: `age`, `-age` or `age desc`
    fn order(&mut self, spec: &str) -> QueryResult<&mut Self> {
        self.apply(|query| Ok(query.with_clauses(|c| push_unique(&mut c.order, [spec]))))
    }

    fn limit(&mut self, limit: Option<u64>) -> QueryResult<&mut Self> {
        self.apply(|query| Ok(query.with_clauses(|c| c.limit = limit)))
    }

    fn offset(&mut self, offset: Option<u64>) -> QueryResult<&mut Self> {
        self.apply(|query| Ok(query.with_clauses(|c| c.offset = offset)))
    }

    /// Replace the source collection
    fn from(&mut self, collection: &str) -> QueryResult<&mut Self> {
        self.apply(|query| Ok(query.with_clauses(|c| c.from = Some(collection.to_string()))))
    }
}

impl<S: Scope<DocumentQuery>> DocumentMethods for S {}
