//! The delivery capability.
//!
//! The dispatcher never performs I/O itself. For every matched event it calls
//! [`EventHandler::deliver`] with a [`Delivery`]; what that means (log it,
//! record it, POST it somewhere) is up to the implementation.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::DeliveryError;
use crate::event::CloudEvent;

/// One event addressed to one trigger.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub delivery_id: Uuid,
    pub project_id: String,
    pub trigger_name: String,
    pub channel: String,
    pub event: CloudEvent,
    pub matched_at: DateTime<Utc>,
}

impl Delivery {
    /// A delivery with a fresh id, matched now.
    #[must_use]
    pub fn new(
        project_id: impl Into<String>,
        trigger_name: impl Into<String>,
        channel: impl Into<String>,
        event: CloudEvent,
    ) -> Self {
        Self {
            delivery_id: Uuid::new_v4(),
            project_id: project_id.into(),
            trigger_name: trigger_name.into(),
            channel: channel.into(),
            event,
            matched_at: Utc::now(),
        }
    }
}

/// Hands matched events to a trigger's downstream function.
///
/// Called synchronously from the publishing thread; implementations that do
/// I/O should be wrapped in a [`QueuedHandler`](super::QueuedHandler).
pub trait EventHandler: Send + Sync {
    /// Deliver one event. An error becomes a `DeliveryFailed` outcome.
    fn deliver(&self, delivery: Delivery) -> Result<(), DeliveryError>;
}

/// Accepts every delivery and logs it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn deliver(&self, delivery: Delivery) -> Result<(), DeliveryError> {
        info!(
            delivery_id = %delivery.delivery_id,
            project_id = %delivery.project_id,
            trigger_name = %delivery.trigger_name,
            channel = %delivery.channel,
            event_type = delivery.event.kind().unwrap_or_default(),
            "Dispatching event to trigger"
        );
        Ok(())
    }
}

/// Records deliveries in memory.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    deliveries: Mutex<Vec<Delivery>>,
}

impl RecordingHandler {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far, in delivery order.
    #[must_use]
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Trigger names in delivery order.
    #[must_use]
    pub fn trigger_names(&self) -> Vec<String> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|d| d.trigger_name.clone())
            .collect()
    }

    /// Number of deliveries recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.deliveries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True when nothing was delivered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventHandler for RecordingHandler {
    fn deliver(&self, delivery: Delivery) -> Result<(), DeliveryError> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(delivery);
        Ok(())
    }
}

impl<H: EventHandler + ?Sized> EventHandler for std::sync::Arc<H> {
    fn deliver(&self, delivery: Delivery) -> Result<(), DeliveryError> {
        (**self).deliver(delivery)
    }
}
