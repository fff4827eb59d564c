//! SQLite backend for burrow search queries
//!
//! Compiled searches become [`SqlQuery`] values: immutable SELECT
//! statements whose conditions carry positional binds. A query that holds
//! an [`SqlitePool`] can be executed directly.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use burrow_query::{Compiler, CompilerDefinition, Results, SearchOptions};
//! use burrow_sqlite::{SqlQuery, SqliteConfig, SqlitePool};
//! use std::sync::Arc;
//!
//! let pool = SqlitePool::new(SqliteConfig::new("./badgers.db"))?;
//! let definition = CompilerDefinition::builder()
//!     .base(SqlQuery::table("badgers").with_pool(pool))
//!     .search_in(["name"], SearchOptions::new())
//!     .build()?;
//!
//! let compiler = Compiler::new(Arc::new(definition))?;
//! let rows = compiler.search("name:bob or bubba")?.rows()?;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod methods;
pub mod query;
pub mod render;

// Re-exports
pub use config::SqliteConfig;
pub use connection::SqlitePool;
pub use error::{SqliteError, SqliteResult};
pub use methods::SqlMethods;
pub use query::{Row, SqlQuery};
pub use render::{count_placeholders, quote_identifier};
