//! Error handling for the Repohero API
//!
//! Field-level failures are reported inside query results by the graph
//! engine. [`ApiError`] covers what happens around an execution: loading
//! plans and seed data, issuing tokens and assembling the engine.

use graph_engine::SchemaError;
use serde::Serialize;
use thiserror::Error;

/// Error body printed when an execution cannot start
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for client-side handling
    pub code: &'static str,
    /// Human-readable error message
    pub message: String,
}

/// Main API error type
#[derive(Error, Debug)]
pub enum ApiError {
    // ========== Authentication ==========
    /// Token could not be verified (expired, malformed, wrong signature)
    #[error("invalid authentication token: {0}")]
    InvalidToken(String),

    /// JWT encoding/decoding error
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    // ========== Input Errors ==========
    /// The query plan could not be read or parsed
    #[error("invalid query plan: {0}")]
    InvalidPlan(String),

    /// Seed data is inconsistent
    #[error("invalid seed data: {0}")]
    InvalidSeed(String),

    /// JSON serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ========== Engine Errors ==========
    /// Schema and resolvers disagree
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    // ========== Internal Errors ==========
    /// Catch-all for unexpected errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Get the error code string for client-side handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidToken(_) => "INVALID_TOKEN",
            Self::Jwt(_) => "JWT_ERROR",
            Self::InvalidPlan(_) => "INVALID_PLAN",
            Self::InvalidSeed(_) => "INVALID_SEED",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Schema(_) => "SCHEMA_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller can fix the error by changing its input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidToken(_) | Self::InvalidPlan(_) | Self::Serialization(_)
        )
    }

    /// Log the error with appropriate severity
    pub fn log(&self) {
        if self.is_client_error() {
            tracing::debug!(error = %self, code = self.error_code(), "Client error");
        } else {
            tracing::error!(error = %self, code = self.error_code(), "Server error occurred");
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code(),
            message: self.to_string(),
        }
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;
