//! `DocumentQuery`: an immutable find over one collection.

use crate::collection::{Collection, DocumentStore};
use crate::error::{DocumentError, DocumentResult};
use crate::selector::Selector;
use burrow_query::{
    merge_clauses, ClauseValue, Clauses, LikePattern, Operator, Predicate, Query, QueryResult,
    Results,
};
use serde_json::{json, Value};
use tracing::debug;

const QUERY_TYPE: &str = "DocumentQuery";

/// A document-store query value. Every operation returns a new value.
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    clauses: Clauses<Selector>,
    store: Option<DocumentStore>,
}

impl DocumentQuery {
    /// Query over every document of `collection`
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            clauses: Clauses {
                from: Some(collection.into()),
                ..Clauses::default()
            },
            store: None,
        }
    }

    pub fn with_store(&self, store: DocumentStore) -> Self {
        Self {
            store: Some(store),
            ..self.clone()
        }
    }

    pub fn store(&self) -> Option<&DocumentStore> {
        self.store.as_ref()
    }

    pub fn clauses(&self) -> &Clauses<Selector> {
        &self.clauses
    }

    pub fn selector(&self) -> &Selector {
        &self.clauses.filter
    }

    /// Inspect one clause category by name (`where` is accepted for `filter`)
    pub fn clause(&self, name: &str) -> QueryResult<ClauseValue<'_>> {
        self.clauses.clause(name, QUERY_TYPE)
    }

    pub(crate) fn with_clauses(&self, edit: impl FnOnce(&mut Clauses<Selector>)) -> Self {
        let mut next = self.clone();
        edit(&mut next.clauses);
        next
    }

    /// Copy with `selector` AND-ed into the filter
    pub fn and_selector(&self, selector: &Selector) -> Self {
        self.with_clauses(|clauses| clauses.filter = clauses.filter.and(selector))
    }

    fn source(&self) -> DocumentResult<Collection> {
        let store = self.store.as_ref().ok_or_else(|| {
            DocumentError::InvalidOperation("query has no document store".to_string())
        })?;
        let name = self.clauses.from.as_deref().ok_or_else(|| {
            DocumentError::InvalidOperation("query has no source collection".to_string())
        })?;
        store.collection(name)
    }
}

/// Selector condition for one comparison
fn condition(operator: Operator, value: &str) -> Value {
    let like = || {
        json!({
            "$regex": LikePattern::parse(value).to_regex(),
            "$options": "i",
        })
    };
    match operator {
        Operator::Eq => json!(value),
        Operator::Ne => json!({ "$ne": value }),
        Operator::Lt => json!({ "$lt": value }),
        Operator::Gt => json!({ "$gt": value }),
        Operator::Lte => json!({ "$lte": value }),
        Operator::Gte => json!({ "$gte": value }),
        Operator::Like => like(),
        Operator::NotLike => json!({ "$not": like() }),
    }
}

impl Query for DocumentQuery {
    fn compare(&self, field: &str, operator: Operator, value: &str) -> QueryResult<Self> {
        Ok(self.and_selector(&Selector::field(field, condition(operator, value))))
    }

    fn merge(&self, predicate: Predicate, others: &[Self]) -> Self {
        if others.is_empty() {
            return self.clone();
        }
        let all: Vec<&Clauses<Selector>> = std::iter::once(self)
            .chain(others)
            .map(|query| &query.clauses)
            .collect();
        Self {
            clauses: merge_clauses(predicate, &all),
            store: self
                .store
                .clone()
                .or_else(|| others.iter().find_map(|query| query.store.clone())),
        }
    }

    fn cleared(&self) -> Self {
        Self {
            clauses: self.clauses.cleared(),
            store: self.store.clone(),
        }
    }

    fn render(&self) -> String {
        let clauses = &self.clauses;
        json!({
            "from": clauses.from,
            "filter": clauses.filter,
            "select": clauses.select,
            "order": clauses.order,
            "limit": clauses.limit,
            "offset": clauses.offset,
        })
        .to_string()
    }
}

impl PartialEq for DocumentQuery {
    fn eq(&self, other: &Self) -> bool {
        self.equivalent(other)
    }
}

impl Results for DocumentQuery {
    type Row = Value;
    type Error = DocumentError;

    fn rows(&self) -> DocumentResult<Vec<Value>> {
        let collection = self.source()?;
        debug!(
            collection = collection.name(),
            filter = %self.clauses.filter.to_value(),
            "executing query"
        );
        collection.find(&self.clauses)
    }

    fn count(&self) -> DocumentResult<usize> {
        Ok(self.rows()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_query::QueryError;
    use test_case::test_case;
    use tracing_test::traced_test;

    #[test_case(Operator::Eq, "25", json!({"age": "25"}))]
    #[test_case(Operator::Ne, "bob", json!({"age": {"$ne": "bob"}}))]
    #[test_case(Operator::Gt, "2.5", json!({"age": {"$gt": "2.5"}}))]
    #[test_case(Operator::Lte, "true", json!({"age": {"$lte": "true"}}))]
    #[test_case(Operator::Like, "b?b*", json!({"age": {"$regex": "^b.b.*", "$options": "i"}}))]
    #[test_case(Operator::NotLike, "1.5", json!({"age": {"$not": {"$regex": "^1\\.5", "$options": "i"}}}))]
    fn test_compare(operator: Operator, value: &str, expected: Value) {
        let query = DocumentQuery::collection("badgers").compare("age", operator, value).unwrap();
        assert_eq!(query.selector().to_value(), expected);
    }

    #[test]
    fn test_repeated_compare_on_one_field_nests() {
        let query = DocumentQuery::collection("badgers")
            .compare("age", Operator::Gt, "3")
            .and_then(|q| q.compare("age", Operator::Lt, "9"))
            .unwrap();
        assert_eq!(
            query.selector().to_value(),
            json!({"$and": [{"age": {"$gt": "3"}}, {"age": {"$lt": "9"}}]})
        );
    }

    #[test]
    fn test_merge_is_structural() {
        let base = DocumentQuery::collection("badgers");
        let a = base.compare("name", Operator::Eq, "bob").unwrap();
        let b = base.compare("age", Operator::Gt, "3").unwrap();

        let merged = a.merge(Predicate::Or, &[b]);
        assert_eq!(
            merged.selector().to_value(),
            json!({"$or": [{"name": "bob"}, {"age": {"$gt": "3"}}]})
        );
        assert_eq!(merged.clause("from").unwrap(), ClauseValue::Source(Some("badgers")));
    }

    #[test]
    fn test_render_snapshot() {
        let query = DocumentQuery::collection("badgers")
            .compare("name", Operator::Like, "bo")
            .unwrap();
        insta::assert_snapshot!(
            query.render(),
            @r#"{"filter":{"name":{"$options":"i","$regex":"^bo"}},"from":"badgers","limit":null,"offset":null,"order":[],"select":[]}"#
        );
    }

    #[test]
    fn test_cleared_keeps_collection() {
        let query = DocumentQuery::collection("badgers")
            .compare("name", Operator::Eq, "bob")
            .unwrap();
        assert_eq!(query.cleared(), DocumentQuery::collection("badgers"));
    }

    #[test]
    fn test_unknown_clause() {
        let err = DocumentQuery::default().clause("bogus").unwrap_err();
        assert!(matches!(err, QueryError::NoSuchClause { ref query_type, .. } if query_type == "DocumentQuery"));
    }

    #[test]
    fn test_execution_needs_store_and_collection() {
        let query = DocumentQuery::collection("badgers");
        assert!(matches!(query.rows(), Err(DocumentError::InvalidOperation(_))));

        let store = DocumentStore::new();
        assert!(matches!(
            query.with_store(store.clone()).rows(),
            Err(DocumentError::UnknownCollection(_))
        ));
        assert!(matches!(
            DocumentQuery::default().with_store(store).count(),
            Err(DocumentError::InvalidOperation(_))
        ));
    }

    #[test]
    #[traced_test]
    fn test_rows_and_count() {
        let store = DocumentStore::new();
        store.insert(
            "badgers",
            vec![json!({"name": "bob", "age": 35}), json!({"name": "billy", "age": 12})],
        );
        let query = DocumentQuery::collection("badgers")
            .with_store(store)
            .compare("age", Operator::Gt, "20")
            .unwrap();

        assert_eq!(query.rows().unwrap(), [json!({"name": "bob", "age": 35})]);
        assert_eq!(query.count().unwrap(), 1);
        assert!(!query.is_empty().unwrap());
        assert!(logs_contain("executing query"));
    }
}
