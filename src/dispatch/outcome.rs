//! Delivery outcomes.
//!
//! A publish call yields one [`DeliveryOutcome`] per event, in batch order.
//! The call as a whole is accepted unless at least one event was invalid;
//! unmatched events and failed deliveries do not affect the aggregate.

use serde::Serialize;

use crate::trigger::MatchKey;

/// What happened to one published event.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// Handed to the matched trigger's handler.
    Dispatched {
        project_id: String,
        trigger_name: String,
    },

    /// No trigger registered for the event's match key.
    Unmatched { match_key: MatchKey },

    /// Structurally malformed event (no `type`).
    Invalid { reason: String },

    /// Matched, but the handler refused the delivery.
    DeliveryFailed {
        trigger_name: String,
        reason: String,
        retryable: bool,
    },
}

impl DeliveryOutcome {
    /// True for `Invalid`.
    #[must_use]
    pub const fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid { .. })
    }

    /// True for `Dispatched`.
    #[must_use]
    pub const fn is_dispatched(&self) -> bool {
        matches!(self, Self::Dispatched { .. })
    }

    /// The trigger the event matched, for dispatched and failed deliveries.
    #[must_use]
    pub fn trigger_name(&self) -> Option<&str> {
        match self {
            Self::Dispatched { trigger_name, .. } | Self::DeliveryFailed { trigger_name, .. } => {
                Some(trigger_name)
            }
            Self::Unmatched { .. } | Self::Invalid { .. } => None,
        }
    }
}

/// Aggregate status of a publish call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    /// No event was invalid (transport 200).
    Accepted,
    /// At least one event was invalid (transport 400).
    Rejected,
}

impl PublishStatus {
    /// HTTP status code the transport reports for this status.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::Accepted => 200,
            Self::Rejected => 400,
        }
    }
}

/// Result of one publish call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    /// Channel the batch was published to.
    pub channel: String,
    /// Aggregate status.
    pub status: PublishStatus,
    /// One outcome per event, in batch order.
    pub outcomes: Vec<DeliveryOutcome>,
}

impl PublishReport {
    /// Build a report, deriving the aggregate status from the outcomes.
    #[must_use]
    pub fn new(channel: impl Into<String>, outcomes: Vec<DeliveryOutcome>) -> Self {
        let status = if outcomes.iter().any(DeliveryOutcome::is_invalid) {
            PublishStatus::Rejected
        } else {
            PublishStatus::Accepted
        };
        Self {
            channel: channel.into(),
            status,
            outcomes,
        }
    }

    /// True when the call succeeds (200).
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.status == PublishStatus::Accepted
    }

    /// Events handed to a handler.
    #[must_use]
    pub fn dispatched_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_dispatched()).count()
    }

    /// Events missing a `type`.
    #[must_use]
    pub fn invalid_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_invalid()).count()
    }

    /// Events with no registered trigger.
    #[must_use]
    pub fn unmatched_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, DeliveryOutcome::Unmatched { .. }))
            .count()
    }
}
