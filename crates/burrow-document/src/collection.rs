//! In-memory document collections.

use crate::error::{DocumentError, DocumentResult};
use crate::selector::{compare_values, resolve, Selector};
use burrow_query::Clauses;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// A named, immutable set of JSON documents.
#[derive(Debug, Clone)]
pub struct Collection {
    name: String,
    documents: Arc<Vec<Value>>,
}

impl Collection {
    pub fn new(name: impl Into<String>, documents: Vec<Value>) -> Self {
        let name = name.into();
        info!(collection = %name, documents = documents.len(), "Creating document collection");
        Self {
            name,
            documents: Arc::new(documents),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn documents(&self) -> &[Value] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Documents matching `clauses.filter`, sorted by `order`, windowed by
    /// `offset`/`limit` and projected onto `select`.
    pub fn find(&self, clauses: &Clauses<Selector>) -> DocumentResult<Vec<Value>> {
        let filter = clauses.filter.compile()?;
        let mut matched: Vec<&Value> = self
            .documents
            .iter()
            .filter(|document| filter.matches(document))
            .collect();
        debug!(
            collection = %self.name,
            scanned = self.documents.len(),
            matched = matched.len(),
            "filtered collection"
        );

        if !clauses.order.is_empty() {
            let keys: Vec<SortKey<'_>> = clauses.order.iter().map(|spec| SortKey::parse(spec)).collect();
            matched.sort_by(|a, b| {
                keys.iter()
                    .map(|key| key.compare(a, b))
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(Ordering::Equal)
            });
        }

        let offset = clauses.offset.map_or(0, window);
        let limit = clauses.limit.map_or(usize::MAX, window);
        Ok(matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|document| project(document, &clauses.select))
            .collect())
    }
}

fn window(count: u64) -> usize {
    usize::try_from(count).unwrap_or(usize::MAX)
}

/// One `order` entry: `age`, `-age`, `age desc` or `age asc`.
struct SortKey<'a> {
    path: &'a str,
    descending: bool,
}

impl<'a> SortKey<'a> {
    fn parse(spec: &'a str) -> Self {
        let spec = spec.trim();
        if let Some(path) = spec.strip_prefix('-') {
            return Self {
                path: path.trim(),
                descending: true,
            };
        }
        match spec.rsplit_once(char::is_whitespace) {
            Some((path, direction)) if direction.eq_ignore_ascii_case("desc") => Self {
                path: path.trim(),
                descending: true,
            },
            Some((path, direction)) if direction.eq_ignore_ascii_case("asc") => Self {
                path: path.trim(),
                descending: false,
            },
            _ => Self {
                path: spec,
                descending: false,
            },
        }
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let a = resolve(a, self.path).into_iter().next();
        let b = resolve(b, self.path).into_iter().next();
        let ordering = sort_rank(a)
            .cmp(&sort_rank(b))
            .then_with(|| match (a, b) {
                (Some(a), Some(b)) => compare_values(a, b).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            });
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

/// Missing and null sort first, then numbers, strings, booleans, the rest
fn sort_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Bool(_)) => 3,
        Some(_) => 4,
    }
}

/// Copy of `document` with only `paths`; everything when `paths` is empty
fn project(document: &Value, paths: &[String]) -> Value {
    if paths.is_empty() {
        return document.clone();
    }
    let mut projected = Map::new();
    for path in paths {
        let pointer: String = path
            .split('.')
            .map(|segment| format!("/{}", segment.replace('~', "~0").replace('/', "~1")))
            .collect();
        if let Some(value) = document.pointer(&pointer) {
            insert_path(&mut projected, path, value.clone());
        }
    }
    Value::Object(projected)
}

fn insert_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            target.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(inner) = entry {
                insert_path(inner, rest, value);
            }
        }
    }
}

// ============================================================================
// Store
// ============================================================================

/// Named collections shared between queries.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace the collection `name`
    pub fn insert(&self, name: impl Into<String>, documents: Vec<Value>) -> Collection {
        let collection = Collection::new(name, documents);
        self.collections
            .write()
            .insert(collection.name().to_string(), collection.clone());
        collection
    }

    pub fn collection(&self, name: &str) -> DocumentResult<Collection> {
        self.collections
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| DocumentError::UnknownCollection(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracing_test::traced_test;

    fn setts() -> Collection {
        Collection::new(
            "setts",
            vec![
                json!({"name": "hill", "depth": 3, "owner": {"name": "bob"}}),
                json!({"name": "wood", "depth": 9, "owner": {"name": "alice"}}),
                json!({"name": "bank", "owner": {"name": "bob"}}),
                json!({"name": "moor", "depth": 5}),
            ],
        )
    }

    fn names(documents: &[Value]) -> Vec<&str> {
        documents
            .iter()
            .map(|document| document["name"].as_str().unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_find_filters() {
        let clauses = Clauses {
            filter: Selector::field("owner.name", json!("bob")),
            ..Clauses::default()
        };
        assert_eq!(names(&setts().find(&clauses).unwrap()), ["hill", "bank"]);
    }

    #[test]
    fn test_sort_missing_first_then_window() {
        let clauses: Clauses<Selector> = Clauses {
            order: vec!["depth".into()],
            offset: Some(1),
            limit: Some(2),
            ..Clauses::default()
        };
        assert_eq!(names(&setts().find(&clauses).unwrap()), ["hill", "moor"]);
    }

    #[test]
    fn test_sort_descending_with_tiebreak() {
        for spec in ["-depth", "depth DESC", "depth desc"] {
            let clauses: Clauses<Selector> = Clauses {
                order: vec![spec.into(), "name".into()],
                ..Clauses::default()
            };
            assert_eq!(
                names(&setts().find(&clauses).unwrap()),
                ["wood", "moor", "hill", "bank"]
            );
        }
    }

    #[test]
    fn test_projection_keeps_nested_paths() {
        let clauses: Clauses<Selector> = Clauses {
            select: vec!["name".into(), "owner.name".into()],
            limit: Some(1),
            ..Clauses::default()
        };
        assert_eq!(
            setts().find(&clauses).unwrap(),
            [json!({"name": "hill", "owner": {"name": "bob"}})]
        );
    }

    #[test]
    fn test_invalid_filter_errors() {
        let clauses = Clauses {
            filter: Selector::field("depth", json!({"$near": 1})),
            ..Clauses::default()
        };
        assert!(setts().find(&clauses).is_err());
    }

    #[test]
    #[traced_test]
    fn test_store_lookup() {
        let store = DocumentStore::new();
        store.insert("setts", vec![json!({"name": "hill"})]);

        assert_eq!(store.collection("setts").unwrap().len(), 1);
        assert_eq!(store.names(), ["setts"]);
        assert!(matches!(
            store.collection("burrows"),
            Err(DocumentError::UnknownCollection(_))
        ));
        assert!(logs_contain("Creating document collection"));
    }
}
