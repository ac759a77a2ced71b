//! Error types for the graph engine
//!
//! Two families exist. [`SchemaError`] describes a broken schema or a
//! resolver that contradicts it; it is fatal and aborts the execution.
//! [`FieldError`] describes a runtime failure inside one field; it is
//! recorded in the result and the rest of the selection tree carries on.

use serde::Serialize;
use thiserror::Error;

/// Schema configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A type was referenced but never registered
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// Union or interface resolution found zero or several members
    #[error("could not resolve a single member of {abstract_type}: {detail}")]
    AmbiguousOrUnmatchedType {
        abstract_type: String,
        detail: String,
    },

    /// A field is not declared on its owning type
    #[error("field {field} is not declared on type {type_name}")]
    UnknownField { type_name: String, field: String },

    /// The same type name was registered twice
    #[error("type {0} is registered more than once")]
    DuplicateType(String),

    /// The same field name appears twice on a type
    #[error("field {field} is declared more than once on {type_name}")]
    DuplicateField { type_name: String, field: String },

    /// The tag mapping of a union or interface is not a bijection onto its members
    #[error("invalid possible types for {abstract_type}: {reason}")]
    InvalidPossibleTypes {
        abstract_type: String,
        reason: String,
    },

    /// An implementor does not match a field of its interface
    #[error("{type_name} does not implement {interface}.{field}")]
    InterfaceMismatch {
        type_name: String,
        interface: String,
        field: String,
    },

    /// The plan targets a root type the schema does not have
    #[error("schema has no {0} root type")]
    UnknownRootType(&'static str),
}

/// Machine-readable classification of a recorded field error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NonNullViolation,
    BatchFetchFailed,
    Cancelled,
    InvalidArgument,
    InvalidValue,
    ResolverError,
}

/// Runtime errors scoped to a single field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// A non-null field produced no value
    #[error("cannot return null for non-null field {type_name}.{field}")]
    NonNullViolation { type_name: String, field: String },

    /// The batched backend call for a collection failed
    #[error("batch fetch from {collection} failed: {message}")]
    BatchFetchFailed { collection: String, message: String },

    /// The execution was cancelled or timed out
    #[error("execution cancelled")]
    Cancelled,

    /// An argument was missing or had the wrong shape
    #[error("invalid argument {name}: {reason}")]
    InvalidArgument { name: String, reason: String },

    /// A resolver produced a value that does not fit the declared shape
    #[error("expected {expected}, found {found}")]
    InvalidValue { expected: String, found: String },

    /// A resolver reported a failure of its own
    #[error("{0}")]
    Resolver(String),
}

impl FieldError {
    /// Create a resolver error from any message
    pub fn new(message: impl Into<String>) -> Self {
        Self::Resolver(message.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Get the classification recorded alongside the message
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NonNullViolation { .. } => ErrorKind::NonNullViolation,
            Self::BatchFetchFailed { .. } => ErrorKind::BatchFetchFailed,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::InvalidValue { .. } => ErrorKind::InvalidValue,
            Self::Resolver(_) => ErrorKind::ResolverError,
        }
    }

    /// Log the error with a severity matching its kind
    pub fn log(&self, path: &str) {
        match self {
            Self::BatchFetchFailed { .. } => {
                tracing::error!(error = %self, path, "Batched fetch failed");
            }
            Self::Cancelled => {
                tracing::warn!(path, "Field cancelled");
            }
            Self::Resolver(_) => {
                tracing::warn!(error = %self, path, "Resolver error");
            }
            _ => {
                tracing::debug!(error = %self, kind = ?self.kind(), path, "Field error");
            }
        }
    }
}

/// Result type for resolvers and loads
pub type FieldResult<T> = Result<T, FieldError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(FieldError::Cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(FieldError::new("boom").kind(), ErrorKind::ResolverError);
        assert_eq!(
            FieldError::invalid_argument("id", "missing").kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_error_display() {
        let err = FieldError::NonNullViolation {
            type_name: "Review".to_string(),
            field: "user".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "cannot return null for non-null field Review.user"
        );
        assert_eq!(
            SchemaError::UnknownType("Repo".to_string()).to_string(),
            "unknown type: Repo"
        );
    }

    #[test]
    fn test_kind_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorKind::BatchFetchFailed).unwrap();
        assert_eq!(json, "\"BATCH_FETCH_FAILED\"");
    }
}
