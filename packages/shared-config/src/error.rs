//! Configuration error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingEnvVar(String),

    /// A variable is set but cannot be used
    #[error("{name}={value:?} is invalid: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },

    /// Values parse but do not make sense together or on their own
    #[error("invalid configuration: {0}")]
    ValidationError(String),
}

impl ConfigError {
    pub(crate) fn invalid(name: &str, value: &str, reason: impl ToString) -> Self {
        Self::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    /// The environment variable at fault, if one is
    pub fn env_var(&self) -> Option<&str> {
        match self {
            Self::MissingEnvVar(name) | Self::InvalidValue { name, .. } => Some(name),
            Self::ValidationError(_) => None,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
