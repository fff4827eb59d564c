//! Monadic operations rule bodies may call on a SQL scope.

use crate::query::SqlQuery;
use crate::render::{count_placeholders, quote_identifier};
use burrow_query::{push_unique, QueryError, QueryResult, Scope};
use serde_json::Value;

/// Whitelisted operations of [`SqlQuery`], available on every
/// `Scope<SqlQuery>` (the rule builder and `any_of`/`all_of` branches).
pub trait SqlMethods: Scope<SqlQuery> {
    /// Add raw select expressions
    fn select<I, S>(&mut self, columns: I) -> QueryResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.apply(|query| Ok(query.with_clauses(|c| push_unique(&mut c.select, columns))))
    }

    /// Replace the source table
    fn from(&mut self, table: &str) -> QueryResult<&mut Self> {
        self.apply(|query| Ok(query.with_clauses(|c| c.from = Some(table.to_string()))))
    }

    /// Add a raw join clause, e.g. `JOIN setts ON setts.badger_id = badgers.id`
    fn joins(&mut self, join: &str) -> QueryResult<&mut Self> {
        self.apply(|query| Ok(query.with_clauses(|c| push_unique(&mut c.joins, [join]))))
    }

    /// Add a condition with one bind per `?` placeholder
    fn filter(&mut self, expr: &str, binds: Vec<Value>) -> QueryResult<&mut Self> {
        check_binds(expr, &binds)?;
        self.apply(|query| Ok(query.with_clauses(|c| c.filter.push(expr, binds))))
    }

    /// `"field" = ?` with `value` bound
    fn filter_eq(&mut self, field: &str, value: impl Into<Value>) -> QueryResult<&mut Self> {
        let expr = format!("{} = ?", quote_identifier(field));
        self.filter(&expr, vec![value.into()])
    }

    /// Add a group condition with one bind per `?` placeholder
    fn having(&mut self, expr: &str, binds: Vec<Value>) -> QueryResult<&mut Self> {
        check_binds(expr, &binds)?;
        self.apply(|query| Ok(query.with_clauses(|c| c.having.push(expr, binds))))
    }

    fn group(&mut self, column: &str) -> QueryResult<&mut Self> {
        self.apply(|query| Ok(query.with_clauses(|c| push_unique(&mut c.group, [column]))))
    }

    /// Add a raw ordering term, e.g. `age DESC`
    fn order(&mut self, clause: &str) -> QueryResult<&mut Self> {
        self.apply(|query| Ok(query.with_clauses(|c| push_unique(&mut c.order, [clause]))))
    }

    fn limit(&mut self, limit: Option<u64>) -> QueryResult<&mut Self> {
        self.apply(|query| Ok(query.with_clauses(|c| c.limit = limit)))
    }

    fn offset(&mut self, offset: Option<u64>) -> QueryResult<&mut Self> {
        self.apply(|query| Ok(query.with_clauses(|c| c.offset = offset)))
    }
}

impl<S: Scope<SqlQuery>> SqlMethods for S {}

fn check_binds(expr: &str, binds: &[Value]) -> QueryResult<()> {
    let expected = count_placeholders(expr);
    if expected != binds.len() {
        return Err(QueryError::BindCount {
            expression: expr.to_string(),
            expected,
            found: binds.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_query::{Builder, MergingBuilder, Predicate};
    use serde_json::json;

    fn builder() -> Builder<SqlQuery> {
        Builder::new(SqlQuery::table("badgers"), false)
    }

    #[test]
    fn test_chained_operations() {
        let mut scope = builder();
        scope
            .select(["name", "age"])
            .and_then(|s| s.filter_eq("name", "bob"))
            .and_then(|s| s.order("age DESC"))
            .and_then(|s| s.limit(Some(3)))
            .unwrap();
        assert!(scope.is_touched());
        assert_eq!(
            scope.sql(),
            "SELECT name, age FROM \"badgers\" WHERE \"name\" = ?1 ORDER BY age DESC LIMIT 3"
        );
    }

    #[test]
    fn test_bind_count_mismatch() {
        let mut scope = builder();
        let err = scope.filter("age > ? AND iq < ?", vec![json!(1)]).unwrap_err();
        assert!(matches!(
            err,
            QueryError::BindCount { expected: 2, found: 1, .. }
        ));
        assert!(!scope.is_touched());
    }

    #[test]
    fn test_having_binds_follow_filter_binds() {
        let mut scope = builder();
        scope
            .having("COUNT(*) > ?", vec![json!(2)])
            .unwrap()
            .group("name")
            .unwrap()
            .filter("age < ?", vec![json!(9)])
            .unwrap();
        assert_eq!(
            scope.sql(),
            "SELECT * FROM \"badgers\" WHERE age < ?1 GROUP BY name HAVING COUNT(*) > ?2"
        );
        assert_eq!(scope.binds(), [json!(9), json!(2)]);
    }

    #[test]
    fn test_from_replaces_table() {
        let mut scope = builder();
        scope.from("setts").unwrap().joins("JOIN badgers ON 1").unwrap();
        assert_eq!(scope.sql(), "SELECT * FROM \"setts\" JOIN badgers ON 1");
    }

    #[test]
    fn test_merging_builder_branches() {
        let mut branches = MergingBuilder::new(SqlQuery::table("badgers"), false);
        branches.filter_eq("name", "bob").unwrap();
        branches.filter_eq("nickname", "bob").unwrap();
        let merged = branches.merge(Predicate::Or);
        assert_eq!(
            merged.sql(),
            "SELECT * FROM \"badgers\" WHERE (\"name\" = ?1) OR (\"nickname\" = ?2)"
        );
    }
}
