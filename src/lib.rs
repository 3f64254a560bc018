//! # Eventarc Emulator
//!
//! A local stand-in for an Eventarc-style event routing service. Functions
//! register triggers (an event type on a channel); publishers push batches of
//! CloudEvents to a channel; each event is matched against the registered
//! triggers and handed to the matching trigger's handler.
//!
//! ## Core Concepts
//!
//! - **Trigger**: interest in one event type on one channel, owned by a project
//! - **Match key**: `event_type + "-" + channel`; one trigger per key, last write wins
//! - **Dispatch**: handing a matched event to an [`EventHandler`]
//! - **Publish report**: per-event outcomes plus the aggregate accept/reject status
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use eventarc_emulator::{CloudEvent, EventTrigger, PublishDispatcher, RecordingHandler, TriggerRegistry};
//!
//! let registry = Arc::new(TriggerRegistry::default());
//! registry
//!     .register("demo", "onCustom", Some(EventTrigger::new("custom.event", "my-channel")))
//!     .unwrap();
//!
//! let handler = Arc::new(RecordingHandler::new());
//! let dispatcher = PublishDispatcher::new(Arc::clone(&registry), handler.clone());
//!
//! let report = dispatcher.publish("my-channel", vec![CloudEvent::new("custom.event")]);
//! assert!(report.is_accepted());
//! assert_eq!(handler.trigger_names(), vec!["onCustom"]);
//! ```
//!
//! With the `server` feature the crate also provides the HTTP routes
//! ([`transport`]), the emulator lifecycle ([`emulator`]) and the
//! `eventarc-emulator` binary.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod registry;
pub mod trigger;

#[cfg(feature = "server")]
pub mod emulator;
#[cfg(feature = "server")]
pub mod transport;

// Re-export primary types at crate root for convenience
pub use config::{DeliveryConfig, EmulatorConfig};
pub use dispatch::{
    Delivery, DeliveryOutcome, EventHandler, LoggingHandler, PublishDispatcher, PublishReport,
    PublishStatus, QueuedHandler, QueuedHandlerConfig, RecordingHandler,
};
pub use error::{
    DeliveryError, EmulatorError, EmulatorResult, InvalidEvent, InvalidTrigger, RegistryError,
};
pub use event::{CloudEvent, PublishBatch};
pub use registry::{CollisionPolicy, RegistryConfig, TriggerRegistry};
pub use trigger::{EventTrigger, MatchKey, TriggerEntry};

#[cfg(feature = "server")]
pub use emulator::{EmulatorInfo, EventarcEmulator};
