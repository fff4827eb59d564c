//! In-memory document-store backend for burrow search queries
//!
//! Compiled searches become [`DocumentQuery`] values whose conditions are a
//! [`Selector`] tree (`$and`, `$or`, `$gt`, `$regex`, ...). Merging combines
//! selectors structurally rather than as text. Queries holding a
//! [`DocumentStore`] evaluate against its collections directly.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use burrow_document::{DocumentQuery, DocumentStore};
//! use burrow_query::{Compiler, CompilerDefinition, Results, SearchOptions};
//! use std::sync::Arc;
//!
//! let store = DocumentStore::new();
//! store.insert("badgers", documents);
//!
//! let definition = CompilerDefinition::builder()
//!     .base(DocumentQuery::collection("badgers").with_store(store))
//!     .search_in(["name"], SearchOptions::new())
//!     .build()?;
//! let rows = Compiler::new(Arc::new(definition))?.search("name~bo*")?.rows()?;
//! ```

pub mod collection;
pub mod error;
pub mod methods;
pub mod query;
pub mod selector;

// Re-exports
pub use collection::{Collection, DocumentStore};
pub use error::{DocumentError, DocumentResult};
pub use methods::DocumentMethods;
pub use query::DocumentQuery;
pub use selector::{Filter, Selector};
