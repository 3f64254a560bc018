//! Publish-time matching and dispatch.
//!
//! The dispatcher resolves each published event to a match key, consults the
//! [`TriggerRegistry`](crate::registry::TriggerRegistry), and hands matched
//! events to an injected [`EventHandler`]. Handlers that perform I/O are meant
//! to sit behind a [`QueuedHandler`] so publishing never waits on delivery.

/// Publish dispatcher.
pub mod dispatcher;
/// Delivery capability and in-process handlers.
pub mod handler;
/// HTTP delivery to a local functions emulator.
#[cfg(feature = "server")]
pub mod http;
/// Match-key resolution for published events.
pub mod matcher;
/// Per-event outcomes and the aggregate publish report.
pub mod outcome;
/// Background delivery worker.
pub mod queue;

pub use dispatcher::PublishDispatcher;
pub use handler::{Delivery, EventHandler, LoggingHandler, RecordingHandler};
#[cfg(feature = "server")]
pub use http::{HttpFunctionConfig, HttpFunctionHandler};
pub use outcome::{DeliveryOutcome, PublishReport, PublishStatus};
pub use queue::{QueuedHandler, QueuedHandlerConfig};
