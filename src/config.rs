//! Emulator configuration.
//!
//! Every field has a default, so an empty environment yields a working
//! emulator on `127.0.0.1:9299`. With the `server` feature the configuration
//! can be loaded from `EVENTARC_*` environment variables, using `__` to reach
//! nested sections (e.g. `EVENTARC_DELIVERY__FUNCTIONS_URL`).

use std::time::Duration;

use serde::Deserialize;

use crate::dispatch::QueuedHandlerConfig;
#[cfg(feature = "server")]
use crate::error::{EmulatorError, EmulatorResult};
use crate::registry::RegistryConfig;

/// Default listen host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 9299;

/// Top-level emulator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmulatorConfig {
    /// Listen host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port. `0` binds an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Trigger registry behavior.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Outbound delivery.
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

/// Outbound delivery configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeliveryConfig {
    /// Base URL of a functions emulator. When unset, dispatched events are
    /// only logged.
    #[serde(default)]
    pub functions_url: Option<String>,

    /// Bound on deliveries waiting for the worker thread.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Per-request timeout for HTTP delivery, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            registry: RegistryConfig::default(),
            delivery: DeliveryConfig::default(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            functions_url: None,
            queue_capacity: default_queue_capacity(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl DeliveryConfig {
    /// HTTP delivery timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Settings for the delivery queue.
    #[must_use]
    pub fn queue(&self) -> QueuedHandlerConfig {
        QueuedHandlerConfig {
            queue_capacity: self.queue_capacity,
        }
    }
}

#[cfg(feature = "server")]
impl EmulatorConfig {
    /// Loads configuration from `EVENTARC_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `EmulatorError::Config` if a variable is present but cannot be
    /// parsed.
    pub fn from_env() -> EmulatorResult<Self> {
        Self::from_source(config::Environment::with_prefix("EVENTARC"))
    }

    fn from_source(env: config::Environment) -> EmulatorResult<Self> {
        config::Config::builder()
            .add_source(env.prefix_separator("_").separator("__").try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| EmulatorError::config(e.to_string()))
    }
}
