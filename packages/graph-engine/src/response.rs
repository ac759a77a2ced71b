//! Execution results

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::{ErrorKind, FieldError};

/// One step of a response path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

/// Location of a field in the response, e.g. `repos.1.reviews`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Path(Vec<PathSegment>);

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Field(key.to_string()));
        Self(segments)
    }

    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                PathSegment::Field(name) => f.write_str(name)?,
                PathSegment::Index(index) => write!(f, "{}", index)?,
            }
        }
        Ok(())
    }
}

/// A field error as reported to the client
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphError {
    pub message: String,
    pub path: Path,
    pub kind: ErrorKind,
}

impl GraphError {
    pub fn new(error: &FieldError, path: Path) -> Self {
        Self {
            message: error.to_string(),
            path,
            kind: error.kind(),
        }
    }
}

/// Data plus the field errors collected while producing it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub data: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphError>,
}

impl QueryResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors_of_kind(&self, kind: ErrorKind) -> impl Iterator<Item = &GraphError> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }

    /// First error recorded at `path`, written in dotted form
    pub fn error_at(&self, path: &str) -> Option<&GraphError> {
        self.errors.iter().find(|e| e.path.to_string() == path)
    }
}
