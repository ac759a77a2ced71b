//! Graph engine configuration types

use std::time::Duration;

use crate::{parse_env, ConfigError, ConfigResult};

/// Default request timeout in milliseconds
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Execution limits applied to every query run by the graph engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Largest key set sent to a backing store in one fetch.
    /// `None` sends every pending key of a wave in a single call.
    pub max_batch_size: Option<usize>,

    /// Wall-clock budget for one execution; `None` disables the timeout
    pub request_timeout: Option<Duration>,
}

impl EngineConfig {
    /// Load engine configuration from environment variables
    ///
    /// - `GRAPH_MAX_BATCH_SIZE`: keys per fetch, `0` for unlimited (default `0`)
    /// - `GRAPH_REQUEST_TIMEOUT_MS`: execution budget, `0` for none (default `30000`)
    pub fn from_env() -> ConfigResult<Self> {
        let max_batch_size: usize = parse_env("GRAPH_MAX_BATCH_SIZE", 0)?;
        let timeout_ms: u64 = parse_env("GRAPH_REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS)?;

        Ok(Self {
            max_batch_size: (max_batch_size > 0).then_some(max_batch_size),
            request_timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
        })
    }

    /// Configuration without batch splitting or timeout (useful for testing)
    pub fn unbounded() -> Self {
        Self {
            max_batch_size: None,
            request_timeout: None,
        }
    }

    /// Set the batch size limit
    pub fn with_max_batch_size(mut self, size: usize) -> ConfigResult<Self> {
        if size == 0 {
            return Err(ConfigError::ValidationError(
                "max batch size must be greater than zero".to_string(),
            ));
        }
        self.max_batch_size = Some(size);
        Ok(self)
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_batch_size: None,
            request_timeout: Some(Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS)),
        }
    }
}
