//! Error types for the document backend

use burrow_query::QueryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    /// Selector document that can't be evaluated
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    /// Executing a query with no store or no source collection
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error(transparent)]
    Query(#[from] QueryError),
}

pub type DocumentResult<T> = Result<T, DocumentError>;

impl From<DocumentError> for QueryError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::Query(inner) => inner,
            other => QueryError::Backend(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_query_error() {
        let err: QueryError = DocumentError::InvalidSelector("nope".to_string()).into();
        assert_eq!(err.to_string(), "backend error: Invalid selector: nope");

        let inner = QueryError::MissingField {
            term: "x".to_string(),
        };
        let err: QueryError = DocumentError::Query(inner).into();
        assert!(matches!(err, QueryError::MissingField { .. }));
    }
}
