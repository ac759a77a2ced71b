//! Shared configuration for Repohero crates
//!
//! Everything is read from the process environment, optionally seeded from
//! a `.env` file. The graph engine takes an [`EngineConfig`]; the API binary
//! wraps [`CommonConfig`] with its own settings.

mod engine;
mod env;
mod error;

pub use engine::EngineConfig;
pub use env::{optional_env, parse_env, required_env};
pub use error::{ConfigError, ConfigResult};

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Deployment the process runs in, from `ENVIRONMENT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Self::Development),
            "staging" | "stage" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(ConfigError::invalid(
                "ENVIRONMENT",
                s,
                "expected development, staging or production",
            )),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings every Repohero process reads
#[derive(Debug, Clone)]
pub struct CommonConfig {
    pub engine: EngineConfig,
    pub environment: Environment,
    /// Default log filter (`RUST_LOG`, then `LOG_LEVEL`, then `info`)
    pub log_level: String,
}

impl CommonConfig {
    pub fn from_env() -> ConfigResult<Self> {
        let environment = match optional_env("ENVIRONMENT") {
            Some(value) => value.parse()?,
            None => Environment::default(),
        };
        let log_level = optional_env("RUST_LOG")
            .or_else(|| optional_env("LOG_LEVEL"))
            .unwrap_or_else(|| "info".to_string());

        Ok(Self {
            engine: EngineConfig::from_env()?,
            environment,
            log_level,
        })
    }

    /// Read a `.env` file if one exists, then the environment
    pub fn load() -> ConfigResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }
}
