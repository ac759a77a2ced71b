//! Environment variable access
//!
//! A variable set to the empty string counts as unset.

use std::env;
use std::str::FromStr;

use crate::{ConfigError, ConfigResult};

/// Value of `name`, if set and non-empty
pub fn optional_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Value of `name`, failing with [`ConfigError::MissingEnvVar`] when unset
pub fn required_env(name: &str) -> ConfigResult<String> {
    optional_env(name).ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

/// Parse `name` into `T`, or return `default` when unset
pub fn parse_env<T>(name: &str, default: T) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| ConfigError::invalid(name, &value, e)),
        None => Ok(default),
    }
}
