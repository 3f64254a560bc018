//! Error types for the Eventarc emulator.
//!
//! Errors are strongly typed with thiserror so callers (and the HTTP layer)
//! can map each condition onto a precise status without string matching.

use thiserror::Error;

/// A trigger registration that cannot be stored.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidTrigger {
    #[error("Missing event trigger for {trigger_name}")]
    MissingEventTrigger { trigger_name: String },

    #[error("Event trigger for {trigger_name} has no event type")]
    MissingEventType { trigger_name: String },

    #[error("Project id cannot be empty")]
    EmptyProjectId,

    #[error("Trigger name cannot be empty")]
    EmptyTriggerName,
}

/// Errors returned by `TriggerRegistry::register`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Invalid trigger: {0}")]
    Invalid(#[from] InvalidTrigger),

    /// Only raised when the registry runs with `CollisionPolicy::Reject`.
    #[error("Match key '{match_key}' is already held by trigger {existing} (incoming: {incoming})")]
    KeyCollision {
        match_key: String,
        existing: String,
        incoming: String,
    },
}

/// A published event that cannot be matched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidEvent {
    #[error("Event at index {index} has no type")]
    MissingType { index: usize },
}

/// Errors raised while handing an event to a trigger's handler.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Delivery queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("Delivery worker is disconnected")]
    Disconnected,

    #[error("Handler rejected delivery with status {status}")]
    Rejected { status: u16 },

    #[error("Handler unreachable: {message}")]
    Unreachable { message: String },

    #[error("Delivery timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
}

impl DeliveryError {
    /// Returns true if the same delivery may succeed when attempted again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::QueueFull { .. } | Self::Unreachable { .. } | Self::Timeout { .. } => true,
            Self::Rejected { status } => *status >= 500,
            Self::Disconnected => false,
        }
    }
}

/// Top-level error type for the emulator.
#[derive(Debug, Error)]
pub enum EmulatorError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl EmulatorError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a registry error.
    #[must_use]
    pub const fn is_registry(&self) -> bool {
        matches!(self, Self::Registry(_))
    }

    /// Returns true if this is a delivery error.
    #[must_use]
    pub const fn is_delivery(&self) -> bool {
        matches!(self, Self::Delivery(_))
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Delivery(e) => e.is_retryable(),
            Self::Registry(_) | Self::Config { .. } | Self::Io(_) | Self::Internal { .. } => false,
        }
    }
}

/// Result type alias for emulator operations.
pub type EmulatorResult<T> = Result<T, EmulatorError>;
