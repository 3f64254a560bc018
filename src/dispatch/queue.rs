//! Background delivery worker.
//!
//! `QueuedHandler` accepts deliveries with a non-blocking `try_send` into a
//! bounded channel and forwards them to an inner handler on a dedicated
//! thread. Publishing therefore never waits on downstream I/O; a full queue
//! surfaces as a retryable `DeliveryError::QueueFull`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{debug, warn};

use crate::error::{DeliveryError, EmulatorError, EmulatorResult};

use super::handler::{Delivery, EventHandler};

/// Queue sizing.
#[derive(Debug, Clone)]
pub struct QueuedHandlerConfig {
    /// Max queued deliveries before `QueueFull` is reported.
    pub queue_capacity: usize,
}

impl Default for QueuedHandlerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    delivered: AtomicU64,
    failed: AtomicU64,
}

/// Forwards deliveries to an inner handler on a worker thread.
pub struct QueuedHandler {
    capacity: usize,
    tx: Mutex<Option<Sender<Delivery>>>,
    counters: Arc<Counters>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for QueuedHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedHandler")
            .field("capacity", &self.capacity)
            .field("delivered", &self.delivered())
            .field("failed", &self.failed())
            .finish_non_exhaustive()
    }
}

impl QueuedHandler {
    /// Spawn the worker thread.
    pub fn start(cfg: &QueuedHandlerConfig, inner: Box<dyn EventHandler>) -> EmulatorResult<Self> {
        let capacity = cfg.queue_capacity.max(1);
        let (tx, rx) = bounded::<Delivery>(capacity);
        let counters = Arc::new(Counters::default());

        let thread_counters = Arc::clone(&counters);
        let join = thread::Builder::new()
            .name("eventarc-delivery".to_string())
            .spawn(move || worker_loop(inner, rx, thread_counters))
            .map_err(|e| EmulatorError::internal(format!("failed to spawn delivery worker: {e}")))?;

        Ok(Self {
            capacity,
            tx: Mutex::new(Some(tx)),
            counters,
            join: Mutex::new(Some(join)),
        })
    }

    /// Deliveries the inner handler accepted.
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.counters.delivered.load(Ordering::Relaxed)
    }

    /// Deliveries the inner handler refused.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.counters.failed.load(Ordering::Relaxed)
    }

    /// Stop accepting deliveries, drain the queue and wait for the worker.
    ///
    /// Idempotent.
    pub fn shutdown(&self) {
        // Closing the channel lets the worker drain queued deliveries then exit.
        drop(self.tx.lock().unwrap_or_else(PoisonError::into_inner).take());
        let handle = self.join.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("delivery worker panicked");
            }
        }
    }
}

impl EventHandler for QueuedHandler {
    fn deliver(&self, delivery: Delivery) -> Result<(), DeliveryError> {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let Some(tx) = tx else {
            return Err(DeliveryError::Disconnected);
        };
        match tx.try_send(delivery) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(DeliveryError::QueueFull {
                capacity: self.capacity,
            }),
            Err(TrySendError::Disconnected(_)) => Err(DeliveryError::Disconnected),
        }
    }
}

impl Drop for QueuedHandler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(inner: Box<dyn EventHandler>, rx: Receiver<Delivery>, counters: Arc<Counters>) {
    while let Ok(delivery) = rx.recv() {
        let delivery_id = delivery.delivery_id;
        let trigger_name = delivery.trigger_name.clone();
        match inner.deliver(delivery) {
            Ok(()) => {
                counters.delivered.fetch_add(1, Ordering::Relaxed);
                debug!(%delivery_id, %trigger_name, "Delivered event");
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(%delivery_id, %trigger_name, error = %e, retryable = e.is_retryable(), "Event delivery failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::handler::RecordingHandler;
    use crate::event::CloudEvent;
    use crossbeam_channel::Receiver as GateRx;

    fn delivery(trigger: &str) -> Delivery {
        Delivery::new("p", trigger, "ch", CloudEvent::new("e"))
    }

    /// Blocks every delivery until the test releases it.
    struct GatedHandler {
        gate: GateRx<()>,
    }

    impl EventHandler for GatedHandler {
        fn deliver(&self, _delivery: Delivery) -> Result<(), DeliveryError> {
            let _ = self.gate.recv();
            Ok(())
        }
    }

    struct FailingHandler;

    impl EventHandler for FailingHandler {
        fn deliver(&self, _delivery: Delivery) -> Result<(), DeliveryError> {
            Err(DeliveryError::Rejected { status: 500 })
        }
    }

    #[test]
    fn forwards_to_inner_handler_in_order() {
        let recorder = Arc::new(RecordingHandler::new());
        let queued = QueuedHandler::start(
            &QueuedHandlerConfig::default(),
            Box::new(Arc::clone(&recorder)),
        )
        .unwrap();

        queued.deliver(delivery("t1")).unwrap();
        queued.deliver(delivery("t2")).unwrap();
        queued.shutdown();

        assert_eq!(recorder.trigger_names(), vec!["t1", "t2"]);
        assert_eq!(queued.delivered(), 2);
        assert_eq!(queued.failed(), 0);
    }

    #[test]
    fn full_queue_is_reported_without_blocking() {
        let (gate_tx, gate_rx) = bounded::<()>(0);
        let queued = QueuedHandler::start(
            &QueuedHandlerConfig { queue_capacity: 1 },
            Box::new(GatedHandler { gate: gate_rx }),
        )
        .unwrap();

        // The worker takes the first delivery and blocks on the gate; the
        // second fills the queue; the third has nowhere to go.
        queued.deliver(delivery("t1")).unwrap();
        let mut saw_full = false;
        for _ in 0..100 {
            match queued.deliver(delivery("t")) {
                Err(DeliveryError::QueueFull { capacity }) => {
                    assert_eq!(capacity, 1);
                    saw_full = true;
                    break;
                }
                Ok(()) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert!(saw_full);

        drop(gate_tx);
        queued.shutdown();
    }

    #[test]
    fn inner_failures_are_counted() {
        let queued =
            QueuedHandler::start(&QueuedHandlerConfig::default(), Box::new(FailingHandler)).unwrap();
        queued.deliver(delivery("t1")).unwrap();
        queued.shutdown();
        assert_eq!(queued.failed(), 1);
        assert_eq!(queued.delivered(), 0);
    }

    #[test]
    fn deliver_after_shutdown_is_disconnected() {
        let queued = QueuedHandler::start(
            &QueuedHandlerConfig::default(),
            Box::new(RecordingHandler::new()),
        )
        .unwrap();
        queued.shutdown();
        queued.shutdown();
        assert_eq!(queued.deliver(delivery("t")), Err(DeliveryError::Disconnected));
    }

    #[test]
    fn concurrent_publishers_share_the_queue() {
        let recorder = Arc::new(RecordingHandler::new());
        let queued = Arc::new(
            QueuedHandler::start(
                &QueuedHandlerConfig { queue_capacity: 4096 },
                Box::new(Arc::clone(&recorder)),
            )
            .unwrap(),
        );

        let publishers: Vec<_> = (0..8)
            .map(|n| {
                let queued = Arc::clone(&queued);
                thread::spawn(move || {
                    for i in 0..100 {
                        queued.deliver(delivery(&format!("t{n}-{i}"))).unwrap();
                    }
                })
            })
            .collect();
        for p in publishers {
            p.join().unwrap();
        }
        queued.shutdown();

        assert_eq!(queued.delivered(), 800);
        assert_eq!(recorder.len(), 800);
    }
}
