//! `SqlQuery`: an immutable SELECT built from clause categories.

use crate::connection::SqlitePool;
use crate::error::{SqliteError, SqliteResult};
use crate::render::{quote_identifier, to_sql};
use burrow_query::{
    merge_clauses, ClauseValue, Clauses, Expressions, LikePattern, Operator, Predicate, Query,
    QueryResult, Results,
};
use rusqlite::params_from_iter;
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Map, Number, Value};
use tracing::debug;

/// One materialized row, keyed by column name
pub type Row = Map<String, Value>;

const QUERY_TYPE: &str = "SqlQuery";

/// A relational query value.
///
/// Every operation returns a new value. The pool travels with the query so
/// compiled results can be executed directly.
#[derive(Debug, Clone, Default)]
pub struct SqlQuery {
    clauses: Clauses<Expressions>,
    pool: Option<SqlitePool>,
}

impl SqlQuery {
    /// Query over every row of `table`
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            clauses: Clauses {
                from: Some(table.into()),
                ..Clauses::default()
            },
            pool: None,
        }
    }

    pub fn with_pool(&self, pool: SqlitePool) -> Self {
        Self {
            pool: Some(pool),
            ..self.clone()
        }
    }

    pub fn pool(&self) -> Option<&SqlitePool> {
        self.pool.as_ref()
    }

    pub fn clauses(&self) -> &Clauses<Expressions> {
        &self.clauses
    }

    /// Inspect one clause category by name (`where` is accepted for `filter`)
    pub fn clause(&self, name: &str) -> QueryResult<ClauseValue<'_>> {
        self.clauses.clause(name, QUERY_TYPE)
    }

    /// Copy with `edit` applied to the clauses
    pub(crate) fn with_clauses(&self, edit: impl FnOnce(&mut Clauses<Expressions>)) -> Self {
        let mut next = self.clone();
        edit(&mut next.clauses);
        next
    }

    /// Statement text with numbered placeholders
    pub fn sql(&self) -> String {
        to_sql(&self.clauses)
    }

    /// Bind values in placeholder order
    pub fn binds(&self) -> Vec<Value> {
        self.clauses
            .filter
            .binds()
            .iter()
            .chain(self.clauses.having.binds())
            .cloned()
            .collect()
    }

    fn executable(&self) -> SqliteResult<(&SqlitePool, Vec<SqlValue>)> {
        let pool = self.pool.as_ref().ok_or_else(|| {
            SqliteError::InvalidOperation("query has no connection pool".to_string())
        })?;
        if self.clauses.from.is_none() {
            return Err(SqliteError::InvalidOperation(
                "query has no source table".to_string(),
            ));
        }
        Ok((pool, self.binds().iter().map(sql_value).collect()))
    }
}

/// SQL operator for a comparison; like operators are handled separately
fn sql_operator(operator: Operator) -> &'static str {
    match operator {
        Operator::Eq => "=",
        Operator::Ne => "!=",
        Operator::Lt => "<",
        Operator::Gt => ">",
        Operator::Lte => "<=",
        Operator::Gte => ">=",
        Operator::Like => "LIKE",
        Operator::NotLike => "NOT LIKE",
    }
}

impl Query for SqlQuery {
    fn compare(&self, field: &str, operator: Operator, value: &str) -> QueryResult<Self> {
        let column = quote_identifier(field);
        let op = sql_operator(operator);
        // Text binds; column affinity converts them for numeric columns
        let (expr, bind) = match operator {
            Operator::Like | Operator::NotLike => (
                format!("{column} {op} ? ESCAPE '\\'"),
                LikePattern::parse(value).to_sql(),
            ),
            _ => (format!("{column} {op} ?"), value.to_string()),
        };
        Ok(self.with_clauses(|clauses| clauses.filter.push(expr, [Value::String(bind)])))
    }

    fn merge(&self, predicate: Predicate, others: &[Self]) -> Self {
        if others.is_empty() {
            return self.clone();
        }
        let all: Vec<&Clauses<Expressions>> = std::iter::once(self)
            .chain(others)
            .map(|query| &query.clauses)
            .collect();
        Self {
            clauses: merge_clauses(predicate, &all),
            pool: self
                .pool
                .clone()
                .or_else(|| others.iter().find_map(|query| query.pool.clone())),
        }
    }

    fn cleared(&self) -> Self {
        Self {
            clauses: self.clauses.cleared(),
            pool: self.pool.clone(),
        }
    }

    fn render(&self) -> String {
        let binds = Value::Array(self.binds());
        format!("{} {}", self.sql(), binds)
    }
}

impl PartialEq for SqlQuery {
    fn eq(&self, other: &Self) -> bool {
        self.equivalent(other)
    }
}

impl Results for SqlQuery {
    type Row = Row;
    type Error = SqliteError;

    fn rows(&self) -> SqliteResult<Vec<Row>> {
        let (pool, binds) = self.executable()?;
        let sql = self.sql();
        debug!(sql = %sql, binds = binds.len(), "executing query");

        pool.with_connection(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            let rows = stmt.query_map(params_from_iter(binds.iter()), |row| {
                let mut record = Row::new();
                for (index, name) in columns.iter().enumerate() {
                    record.insert(name.clone(), json_value(row.get_ref(index)?));
                }
                Ok(record)
            })?;
            let records = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        })
    }

    fn count(&self) -> SqliteResult<usize> {
        let (pool, binds) = self.executable()?;
        let sql = format!("SELECT COUNT(*) FROM ({})", self.sql());
        debug!(sql = %sql, binds = binds.len(), "executing query");

        pool.with_connection(|conn| {
            let count: i64 =
                conn.query_row(&sql, params_from_iter(binds.iter()), |row| row.get(0))?;
            Ok(count as usize)
        })
    }
}

fn sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        Value::Number(number) => match number.as_i64() {
            Some(int) => SqlValue::Integer(int),
            None => SqlValue::Real(number.as_f64().unwrap_or_default()),
        },
        Value::String(text) => SqlValue::Text(text.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(int) => Value::from(int),
        ValueRef::Real(real) => Number::from_f64(real).map_or(Value::Null, Value::Number),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(blob) => Value::Array(blob.iter().copied().map(Value::from).collect()),
    }
}
