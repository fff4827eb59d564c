//! Error types for burrow-query.

use std::path::PathBuf;
use thiserror::Error;

/// Problems with how a compiler was defined or configured.
///
/// These surface when a definition is built, when a compiler is created
/// without a base scope, or when a search surface file can't be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no base scope configured; pass one explicitly or set a base on the definition")]
    NoBaseScope,

    #[error("no rules defined for this compiler")]
    NoRules,

    #[error("matcher references undeclared rule `{rule}`")]
    UndeclaredRule { rule: String },

    #[error("guard references undeclared condition `{name}`")]
    UndeclaredCondition { name: String },

    #[error("rule `{rule}` is already declared on this definition")]
    DuplicateRule { rule: String },

    #[error("invalid search surface: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to read {path}: {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while compiling a search or building a query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Clause inspection asked for a name the query type doesn't have
    #[error("{query_type} has no \"{clause}\" clause")]
    NoSuchClause { clause: String, query_type: String },

    /// A condition expression was given the wrong number of bind values
    #[error("expected {expected} bind value(s) for `{expression}`, got {found}")]
    BindCount {
        expression: String,
        expected: usize,
        found: usize,
    },

    /// `compare` was asked to use a term's field, but the term has none
    #[error("term `{term}` has no field to compare against")]
    MissingField { term: String },

    #[error("invalid pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failure reported by a storage backend while building a query
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for compilation and query building
pub type QueryResult<T> = Result<T, QueryError>;
