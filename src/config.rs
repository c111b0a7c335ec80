//! Startup configuration for the migration host.
//!
//! Values come from `MIGRATE_*` environment variables, for example
//! `MIGRATE_PAGE_SIZE=10` or `MIGRATE_CONTINUATION=self_invoke`. Anything not
//! set falls back to the defaults below.

use ::config::{Config, Environment, Map};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::Error;
use crate::migration::{MAX_PAGE_SIZE, MigrationOptions, RetryConfig};

const ENV_PREFIX: &str = "MIGRATE";

/// How a `Continuing` outcome is resumed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContinuationMode {
    /// Return the continuation to the invoker, which re-invokes with it
    #[default]
    Return,
    /// Asynchronously re-invoke the hosting function with the continuation
    SelfInvoke,
}

/// Typed migration settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Items per page, clamped to `1..=25`
    pub page_size: usize,
    /// Budget reserve before yielding a continuation
    pub safety_margin_ms: u64,
    /// Retry rounds for rejected items
    pub max_retries: usize,
    /// Backoff base, delay = base * 2^attempt
    pub backoff_base_ms: u64,
    /// Delay cap
    pub max_backoff_ms: u64,
    /// Resumption host
    pub continuation: ContinuationMode,
    /// DynamoDB endpoint override
    pub endpoint_url: Option<String>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            safety_margin_ms: 100,
            max_retries: 5,
            backoff_base_ms: 50,
            max_backoff_ms: 5_000,
            continuation: ContinuationMode::Return,
            endpoint_url: None,
        }
    }
}

impl MigrationConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, Error> {
        Self::load(Environment::with_prefix(ENV_PREFIX))
    }

    /// Load from an explicit set of `MIGRATE_*` variables
    pub fn from_source(vars: Map<String, String>) -> Result<Self, Error> {
        Self::load(Environment::with_prefix(ENV_PREFIX).source(Some(vars)))
    }

    fn load(environment: Environment) -> Result<Self, Error> {
        let config: Self = Config::builder()
            .add_source(environment.try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), Error> {
        if self.page_size == 0 {
            return Err(Error::InvalidRequest(
                "page_size must be at least 1".to_string(),
            ));
        }

        if self.backoff_base_ms == 0 {
            return Err(Error::InvalidRequest(
                "backoff_base_ms must be at least 1".to_string(),
            ));
        }

        if self.max_backoff_ms < self.backoff_base_ms {
            return Err(Error::InvalidRequest(format!(
                "max_backoff_ms ({}) is below backoff_base_ms ({})",
                self.max_backoff_ms, self.backoff_base_ms
            )));
        }

        Ok(())
    }

    /// Engine options for these settings
    pub fn options(&self) -> MigrationOptions {
        MigrationOptions {
            page_size: self.page_size.clamp(1, MAX_PAGE_SIZE),
            safety_margin: Duration::from_millis(self.safety_margin_ms),
            retry: RetryConfig {
                max_retries: self.max_retries,
                base_delay: Duration::from_millis(self.backoff_base_ms),
                max_delay: Duration::from_millis(self.max_backoff_ms),
            },
        }
    }
}
