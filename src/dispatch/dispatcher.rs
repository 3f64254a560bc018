//! Publish dispatcher.
//!
//! One linear pass per publish call: every event is evaluated in batch order,
//! independent of its neighbours. An invalid event is recorded and skipped;
//! it never stops evaluation of the rest of the batch.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::event::{CloudEvent, PublishBatch};
use crate::registry::TriggerRegistry;

use super::handler::{Delivery, EventHandler};
use super::matcher::resolve_match_key;
use super::outcome::{DeliveryOutcome, PublishReport};

/// Matches published events against the registry and hands them to a handler.
pub struct PublishDispatcher {
    registry: Arc<TriggerRegistry>,
    handler: Arc<dyn EventHandler>,
}

impl std::fmt::Debug for PublishDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishDispatcher")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl PublishDispatcher {
    /// Dispatcher reading `registry` and delivering through `handler`.
    #[must_use]
    pub fn new(registry: Arc<TriggerRegistry>, handler: Arc<dyn EventHandler>) -> Self {
        Self { registry, handler }
    }

    /// The registry this dispatcher reads from.
    #[must_use]
    pub fn registry(&self) -> &Arc<TriggerRegistry> {
        &self.registry
    }

    /// Publish `events` to `channel`.
    pub fn publish(&self, channel: &str, events: Vec<CloudEvent>) -> PublishReport {
        let mut outcomes = Vec::with_capacity(events.len());
        for (index, event) in events.into_iter().enumerate() {
            outcomes.push(self.dispatch_one(channel, index, event));
        }

        let report = PublishReport::new(channel, outcomes);
        if !report.is_accepted() {
            debug!(
                channel,
                invalid = report.invalid_count(),
                dispatched = report.dispatched_count(),
                "Rejecting publish call with invalid events"
            );
        }
        report
    }

    /// Publish a prepared batch.
    pub fn publish_batch(&self, batch: PublishBatch) -> PublishReport {
        self.publish(&batch.channel, batch.events)
    }

    fn dispatch_one(&self, channel: &str, index: usize, event: CloudEvent) -> DeliveryOutcome {
        let key = match resolve_match_key(&event, channel, index) {
            Ok(key) => key,
            Err(e) => {
                debug!(channel, index, "Event has no type");
                return DeliveryOutcome::Invalid {
                    reason: e.to_string(),
                };
            }
        };

        let Some(entry) = self.registry.lookup(&key) else {
            debug!(match_key = %key, "No trigger registered for event");
            return DeliveryOutcome::Unmatched { match_key: key };
        };

        let delivery = Delivery::new(
            entry.project_id.clone(),
            entry.trigger_name.clone(),
            channel,
            event,
        );
        match self.handler.deliver(delivery) {
            Ok(()) => DeliveryOutcome::Dispatched {
                project_id: entry.project_id.clone(),
                trigger_name: entry.trigger_name.clone(),
            },
            Err(e) => {
                warn!(
                    match_key = %key,
                    trigger = %entry.qualified_name(),
                    error = %e,
                    "Could not hand event to trigger"
                );
                DeliveryOutcome::DeliveryFailed {
                    trigger_name: entry.trigger_name.clone(),
                    reason: e.to_string(),
                    retryable: e.is_retryable(),
                }
            }
        }
    }
}
