//! API configuration

use anyhow::{bail, Context, Result};
use repohero_shared_config::{
    optional_env, parse_env, required_env, CommonConfig, EngineConfig, Environment,
};

/// Minimum required length for JWT_SECRET to be considered secure
const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Default token lifetime in hours
const DEFAULT_JWT_EXPIRY_HOURS: i64 = 24;

/// Secret used outside production when JWT_SECRET is unset
const DEVELOPMENT_JWT_SECRET: &str = "development-secret-change-in-production";

/// API configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Common configuration shared with other services
    pub common: CommonConfig,

    /// JWT secret for signing sign-in tokens
    pub jwt_secret: String,

    /// Token lifetime in hours (default: 24)
    pub jwt_expiry_hours: i64,

    /// Optional JSON seed file for the in-memory store
    pub seed_path: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// In production mode `JWT_SECRET` must be set and at least 32
    /// characters long. In development a default is used with a warning.
    pub fn from_env() -> Result<Self> {
        Self::from_common(CommonConfig::from_env().context("Failed to load config")?)
    }

    /// Complete an already loaded [`CommonConfig`] with the API settings
    pub fn from_common(common: CommonConfig) -> Result<Self> {
        let jwt_secret = Self::load_jwt_secret(common.environment.is_production())?;

        let jwt_expiry_hours = parse_env("JWT_EXPIRY_HOURS", DEFAULT_JWT_EXPIRY_HOURS)?;
        if jwt_expiry_hours <= 0 {
            bail!("JWT_EXPIRY_HOURS must be positive (got {})", jwt_expiry_hours);
        }

        Ok(Self {
            common,
            jwt_secret,
            jwt_expiry_hours,
            seed_path: optional_env("SEED_PATH"),
        })
    }

    fn load_jwt_secret(is_production: bool) -> Result<String> {
        if !is_production {
            return Ok(optional_env("JWT_SECRET").unwrap_or_else(|| {
                tracing::warn!(
                    "JWT_SECRET not set, using insecure default. \
                     This is only acceptable in development mode."
                );
                DEVELOPMENT_JWT_SECRET.to_string()
            }));
        }

        let secret = required_env("JWT_SECRET").with_context(|| {
            format!(
                "JWT_SECRET environment variable is required in production. \
                 Please set a secure secret of at least {} characters.",
                MIN_JWT_SECRET_LENGTH
            )
        })?;
        if secret.len() < MIN_JWT_SECRET_LENGTH {
            bail!(
                "JWT_SECRET must be at least {} characters in production (got {})",
                MIN_JWT_SECRET_LENGTH,
                secret.len()
            );
        }
        Ok(secret)
    }

    /// Get graph engine limits
    pub fn engine(&self) -> &EngineConfig {
        &self.common.engine
    }

    pub fn environment(&self) -> Environment {
        self.common.environment
    }

    pub fn is_production(&self) -> bool {
        self.common.environment.is_production()
    }
}
