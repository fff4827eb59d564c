//! Selector documents and their evaluation.
//!
//! A selector is a JSON object in the usual document-store shape:
//!
//! ```text
//! { "name": "bob",                              equality
//!   "age": { "$gte": 18, "$lt": 65 },           operator document
//!   "$or": [ { "iq": { "$gt": 50 } },           disjunction of selectors
//!            { "nickname": { "$regex": "^bub", "$options": "i" } } ] }
//! ```
//!
//! Paths are dotted (`sett.location`). A path that passes through an array
//! applies the rest of the path to each element, and a leaf array matches if
//! the whole array or any element does.

use crate::error::{DocumentError, DocumentResult};
use burrow_query::{Condition, Predicate};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

// ============================================================================
// Selector
// ============================================================================

/// Conditions tree merged structurally under `$and` / `$or`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selector(Map<String, Value>);

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selector from a JSON object, rejected if it can't be compiled
    pub fn parse(value: Value) -> DocumentResult<Self> {
        let Value::Object(map) = value else {
            return Err(DocumentError::InvalidSelector(format!(
                "expected an object, got {value}"
            )));
        };
        let selector = Self(map);
        selector.compile()?;
        Ok(selector)
    }

    /// Single condition on `path`
    pub fn field(path: impl Into<String>, condition: Value) -> Self {
        let mut map = Map::new();
        map.insert(path.into(), condition);
        Self(map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Conjunction with `other`. Disjoint keys are folded into one document,
    /// overlapping keys are wrapped in `$and`.
    pub fn and(&self, other: &Self) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        if other.0.keys().all(|key| !self.0.contains_key(key)) {
            let mut merged = self.0.clone();
            merged.extend(other.0.clone());
            return Self(merged);
        }
        Self::field(
            "$and",
            Value::Array(vec![self.to_value(), other.to_value()]),
        )
    }

    pub fn compile(&self) -> DocumentResult<Filter> {
        compile_selector(&self.0)
    }

    /// Evaluate against one document
    pub fn matches(&self, document: &Value) -> DocumentResult<bool> {
        Ok(self.compile()?.matches(document))
    }
}

impl Condition for Selector {
    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn entries(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|(key, value)| Self::field(key.clone(), value.clone()).to_value().to_string())
            .collect()
    }

    fn combine(predicate: Predicate, parts: &[&Self]) -> Self {
        let parts: Vec<&Self> = parts.iter().copied().filter(|part| !part.is_empty()).collect();
        match parts.as_slice() {
            [] => Self::default(),
            [single] => (*single).clone(),
            parts => {
                let key = match predicate {
                    Predicate::And => "$and",
                    Predicate::Or => "$or",
                };
                Self::field(key, parts.iter().map(|part| part.to_value()).collect())
            }
        }
    }
}

// ============================================================================
// Compiled form
// ============================================================================

/// A selector compiled for evaluation; regexes are built once.
#[derive(Debug, Clone)]
pub enum Filter {
    All(Vec<Filter>),
    Any(Vec<Filter>),
    Field { path: String, test: FieldTest },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Gt => ordering == Ordering::Greater,
            Self::Gte => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Lte => ordering != Ordering::Greater,
        }
    }
}

/// Test applied to the values found at one path.
#[derive(Debug, Clone)]
pub enum FieldTest {
    Eq(Value),
    Ne(Value),
    Compare(CompareOp, Value),
    Regex(Regex),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
    Not(Box<FieldTest>),
    All(Vec<FieldTest>),
}

impl Filter {
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Self::All(parts) => parts.iter().all(|part| part.matches(document)),
            Self::Any(parts) => parts.iter().any(|part| part.matches(document)),
            Self::Field { path, test } => test.matches(&resolve(document, path)),
        }
    }
}

impl FieldTest {
    fn matches(&self, found: &[&Value]) -> bool {
        match self {
            // null also matches a missing field
            Self::Eq(Value::Null) if found.is_empty() => true,
            Self::Eq(expected) => contains(found, expected),
            Self::Ne(expected) => !Self::Eq(expected.clone()).matches(found),
            Self::Compare(op, bound) => found.iter().any(|value| {
                compare_values(value, bound).is_some_and(|ordering| op.accepts(ordering))
            }),
            Self::Regex(regex) => found
                .iter()
                .any(|value| value.as_str().is_some_and(|text| regex.is_match(text))),
            Self::In(options) => options.iter().any(|option| contains(found, option)),
            Self::Nin(options) => !options.iter().any(|option| contains(found, option)),
            Self::Exists(expected) => found.is_empty() != *expected,
            Self::Not(inner) => !inner.matches(found),
            Self::All(tests) => tests.iter().all(|test| test.matches(found)),
        }
    }
}

fn contains(found: &[&Value], expected: &Value) -> bool {
    found.iter().any(|value| values_equal(value, expected))
}

fn invalid(message: impl Into<String>) -> DocumentError {
    DocumentError::InvalidSelector(message.into())
}

fn compile_selector(map: &Map<String, Value>) -> DocumentResult<Filter> {
    let mut parts = Vec::with_capacity(map.len());
    for (key, value) in map {
        parts.push(match key.as_str() {
            "$and" => Filter::All(compile_list(key, value)?),
            "$or" => Filter::Any(compile_list(key, value)?),
            op if op.starts_with('$') => {
                return Err(invalid(format!("unknown top-level operator `{op}`")))
            }
            path => Filter::Field {
                path: path.to_string(),
                test: compile_test(value)?,
            },
        });
    }
    Ok(Filter::All(parts))
}

fn compile_list(key: &str, value: &Value) -> DocumentResult<Vec<Filter>> {
    let Value::Array(items) = value else {
        return Err(invalid(format!("`{key}` takes an array of selectors")));
    };
    items
        .iter()
        .map(|item| match item {
            Value::Object(map) => compile_selector(map),
            other => Err(invalid(format!("`{key}` entry is not a selector: {other}"))),
        })
        .collect()
}

/// An object whose keys are all operators
fn operator_document(value: &Value) -> Option<&Map<String, Value>> {
    match value {
        Value::Object(map) if !map.is_empty() && map.keys().all(|key| key.starts_with('$')) => {
            Some(map)
        }
        _ => None,
    }
}

fn compile_test(value: &Value) -> DocumentResult<FieldTest> {
    let Some(operators) = operator_document(value) else {
        return Ok(FieldTest::Eq(value.clone()));
    };

    let options = match operators.get("$options") {
        None => "",
        Some(Value::String(options)) if operators.contains_key("$regex") => options,
        Some(_) => return Err(invalid("`$options` needs a string and a `$regex`")),
    };

    let mut tests = Vec::with_capacity(operators.len());
    for (op, operand) in operators {
        tests.push(match op.as_str() {
            "$eq" => FieldTest::Eq(operand.clone()),
            "$ne" => FieldTest::Ne(operand.clone()),
            "$gt" => FieldTest::Compare(CompareOp::Gt, operand.clone()),
            "$gte" => FieldTest::Compare(CompareOp::Gte, operand.clone()),
            "$lt" => FieldTest::Compare(CompareOp::Lt, operand.clone()),
            "$lte" => FieldTest::Compare(CompareOp::Lte, operand.clone()),
            "$in" => FieldTest::In(operand_list(op, operand)?),
            "$nin" => FieldTest::Nin(operand_list(op, operand)?),
            "$exists" => FieldTest::Exists(operand.as_bool().unwrap_or(!operand.is_null())),
            "$regex" => FieldTest::Regex(compile_regex(operand, options)?),
            "$not" => FieldTest::Not(Box::new(compile_test(operand)?)),
            "$options" => continue,
            other => return Err(invalid(format!("unknown operator `{other}`"))),
        });
    }

    Ok(match tests.len() {
        1 => tests.remove(0),
        _ => FieldTest::All(tests),
    })
}

fn operand_list(op: &str, operand: &Value) -> DocumentResult<Vec<Value>> {
    match operand {
        Value::Array(items) => Ok(items.clone()),
        other => Err(invalid(format!("`{op}` takes an array, got {other}"))),
    }
}

fn compile_regex(operand: &Value, options: &str) -> DocumentResult<Regex> {
    let Value::String(pattern) = operand else {
        return Err(invalid(format!("`$regex` takes a string, got {operand}")));
    };
    RegexBuilder::new(pattern)
        .case_insensitive(options.contains('i'))
        .multi_line(options.contains('m'))
        .dot_matches_new_line(options.contains('s'))
        .build()
        .map_err(|e| invalid(format!("invalid `$regex` `{pattern}`: {e}")))
}

// ============================================================================
// Paths and values
// ============================================================================

/// Every value reachable at `path`; leaf arrays contribute their elements too
pub fn resolve<'a>(document: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![document];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => next.extend(map.get(segment)),
                Value::Array(items) => match segment.parse::<usize>() {
                    Ok(index) => next.extend(items.get(index)),
                    Err(_) => next.extend(items.iter().filter_map(|item| item.get(segment))),
                },
                _ => {}
            }
        }
        current = next;
    }

    let mut found = Vec::with_capacity(current.len());
    for value in current {
        found.push(value);
        if let Value::Array(items) = value {
            found.extend(items.iter());
        }
    }
    found
}

/// Whether the stored value `found` equals `expected`. Numbers compare by
/// value (`3 == 3.0`), and text in `expected` is read as the stored kind
/// when it can be: `"35"` equals a stored `35`, `"true"` a stored `true`.
/// A stored string only ever equals the same text.
pub fn values_equal(found: &Value, expected: &Value) -> bool {
    match (found, expected) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Number(number), Value::String(text)) => {
            parse_number(text).is_some_and(|parsed| number.as_f64() == Some(parsed))
        }
        (Value::Bool(flag), Value::String(text)) => parse_bool(text) == Some(*flag),
        _ => found == expected,
    }
}

/// Ordering of the stored value `found` against `bound`, for values of the
/// same kind or a stored number against text that reads as one
pub fn compare_values(found: &Value, bound: &Value) -> Option<Ordering> {
    match (found, bound) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::Number(x), Value::String(y)) => x.as_f64()?.partial_cmp(&parse_number(y)?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|number| number.is_finite())
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn badger() -> Value {
        json!({
            "name": "bob",
            "age": 35,
            "tags": ["grumpy", "nocturnal"],
            "sett": { "location": "hill", "tunnels": [{ "depth": 2 }, { "depth": 7 }] },
            "weight": null,
            "zip": "02134",
            "badge": "1.50",
            "nocturnal": true
        })
    }

    #[test_case(json!({"name": "bob"}), true ; "equality")]
    #[test_case(json!({"name": "alice"}), false ; "equality miss")]
    #[test_case(json!({"age": 35.0}), true ; "number equality across kinds")]
    #[test_case(json!({"age": {"$gt": 30, "$lte": 35}}), true ; "range")]
    #[test_case(json!({"age": {"$lt": 30}}), false ; "range miss")]
    #[test_case(json!({"age": {"$gt": "30"}}), true ; "numeric text compares with numbers")]
    #[test_case(json!({"age": {"$gt": "old"}}), false ; "other text never compares with numbers")]
    #[test_case(json!({"age": "35"}), true ; "numeric text equals number")]
    #[test_case(json!({"zip": "02134"}), true ; "numeric looking text equals itself")]
    #[test_case(json!({"zip": 2134}), false ; "number never equals padded text")]
    #[test_case(json!({"badge": "1.5"}), false ; "text equality is exact")]
    #[test_case(json!({"nocturnal": "TRUE"}), true ; "boolean text equals boolean")]
    #[test_case(json!({"nocturnal": {"$ne": "false"}}), true ; "boolean text not equal")]
    #[test_case(json!({"tags": {"$gt": "a"}}), true ; "text ordering")]
    #[test_case(json!({"name": {"$ne": "alice"}}), true ; "not equal")]
    #[test_case(json!({"tags": "grumpy"}), true ; "array element")]
    #[test_case(json!({"tags": ["grumpy", "nocturnal"]}), true ; "whole array")]
    #[test_case(json!({"tags": {"$ne": "grumpy"}}), false ; "not equal any element")]
    #[test_case(json!({"sett.location": "hill"}), true ; "dotted path")]
    #[test_case(json!({"sett.tunnels.depth": {"$gt": 5}}), true ; "path through array")]
    #[test_case(json!({"sett.tunnels.0.depth": 2}), true ; "array index")]
    #[test_case(json!({"name": {"$regex": "^BO", "$options": "i"}}), true ; "regex with options")]
    #[test_case(json!({"name": {"$regex": "^BO"}}), false ; "regex is case sensitive")]
    #[test_case(json!({"name": {"$not": {"$regex": "^b"}}}), false ; "not regex")]
    #[test_case(json!({"missing": {"$ne": 1}}), true ; "missing field is not equal")]
    #[test_case(json!({"missing": null}), true ; "null matches missing")]
    #[test_case(json!({"weight": null}), true ; "null matches null")]
    #[test_case(json!({"missing": {"$exists": false}}), true ; "exists false")]
    #[test_case(json!({"name": {"$in": ["alice", "bob"]}}), true ; "in")]
    #[test_case(json!({"tags": {"$nin": ["happy"]}}), true ; "not in")]
    #[test_case(json!({"$or": [{"name": "alice"}, {"age": 35}]}), true ; "or")]
    #[test_case(json!({"$and": [{"name": "bob"}, {"age": 1}]}), false ; "and")]
    #[test_case(json!({}), true ; "empty selector")]
    fn test_matches(selector: Value, expected: bool) {
        let selector = Selector::parse(selector).unwrap();
        assert_eq!(selector.matches(&badger()).unwrap(), expected);
    }

    #[test_case(json!(["name"]) ; "not an object")]
    #[test_case(json!({"$nor": []}) ; "unknown top level operator")]
    #[test_case(json!({"age": {"$near": 3}}) ; "unknown operator")]
    #[test_case(json!({"$or": {"a": 1}}) ; "or without array")]
    #[test_case(json!({"name": {"$regex": "("}}) ; "bad regex")]
    #[test_case(json!({"name": {"$options": "i"}}) ; "options without regex")]
    #[test_case(json!({"name": {"$in": "bob"}}) ; "in without array")]
    fn test_invalid_selectors(selector: Value) {
        assert!(matches!(
            Selector::parse(selector),
            Err(DocumentError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_and_folds_disjoint_keys() {
        let a = Selector::field("name", json!("bob"));
        let b = Selector::field("age", json!({"$gt": 3}));
        assert_eq!(
            a.and(&b).to_value(),
            json!({"name": "bob", "age": {"$gt": 3}})
        );
    }

    #[test]
    fn test_and_wraps_overlapping_keys() {
        let a = Selector::field("age", json!({"$gt": 3}));
        let b = Selector::field("age", json!({"$lt": 9}));
        assert_eq!(
            a.and(&b).to_value(),
            json!({"$and": [{"age": {"$gt": 3}}, {"age": {"$lt": 9}}]})
        );
        assert!(a.and(&Selector::new()) == a);
    }

    #[test]
    fn test_combine_under_predicate() {
        let a = Selector::field("name", json!("bob"));
        let b = Selector::field("age", json!(3));
        let empty = Selector::new();

        assert_eq!(
            Selector::combine(Predicate::Or, &[&a, &empty, &b]).to_value(),
            json!({"$or": [{"name": "bob"}, {"age": 3}]})
        );
        assert_eq!(Selector::combine(Predicate::And, &[&empty, &a]), a);
        assert!(Selector::combine(Predicate::And, &[&empty]).is_empty());
    }

    #[test]
    fn test_entries_are_single_key_documents() {
        let selector = Selector::field("name", json!("bob")).and(&Selector::field("age", json!(3)));
        let mut entries = selector.entries();
        entries.sort();
        assert_eq!(entries, [r#"{"age":3}"#, r#"{"name":"bob"}"#]);
    }
}
