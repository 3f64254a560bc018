//! Emulator lifecycle.
//!
//! `EventarcEmulator` owns the registry, the dispatcher and the delivery
//! handler for one emulator instance, and runs the HTTP server in a background
//! task between `start` and `stop`.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::EmulatorConfig;
use crate::dispatch::{
    EventHandler, HttpFunctionConfig, HttpFunctionHandler, LoggingHandler, PublishDispatcher,
    QueuedHandler,
};
use crate::error::{EmulatorError, EmulatorResult};
use crate::registry::TriggerRegistry;
use crate::transport::{self, AppState};

/// Name reported by [`EventarcEmulator::name`].
pub const EMULATOR_NAME: &str = "eventarc";

/// Where an emulator listens.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmulatorInfo {
    pub name: &'static str,
    pub host: String,
    pub port: u16,
}

struct Running {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    join: JoinHandle<std::io::Result<()>>,
}

/// One emulator instance.
pub struct EventarcEmulator {
    cfg: EmulatorConfig,
    registry: Arc<TriggerRegistry>,
    dispatcher: Arc<PublishDispatcher>,
    queue: Option<Arc<QueuedHandler>>,
    running: Mutex<Option<Running>>,
}

impl std::fmt::Debug for EventarcEmulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventarcEmulator")
            .field("cfg", &self.cfg)
            .field("local_addr", &self.local_addr())
            .finish_non_exhaustive()
    }
}

impl EventarcEmulator {
    /// Build an emulator from configuration.
    ///
    /// Dispatched events are POSTed to `delivery.functions_url` through a
    /// background queue when it is set, and only logged otherwise.
    pub fn new(cfg: EmulatorConfig) -> EmulatorResult<Self> {
        let registry = Arc::new(TriggerRegistry::new(cfg.registry));

        let (handler, queue): (Arc<dyn EventHandler>, Option<Arc<QueuedHandler>>) =
            match &cfg.delivery.functions_url {
                Some(base_url) => {
                    let http = HttpFunctionHandler::new(HttpFunctionConfig {
                        base_url: base_url.clone(),
                        timeout: cfg.delivery.timeout(),
                    });
                    let queue = Arc::new(QueuedHandler::start(&cfg.delivery.queue(), Box::new(http))?);
                    (Arc::clone(&queue) as Arc<dyn EventHandler>, Some(queue))
                }
                None => (Arc::new(LoggingHandler), None),
            };

        Ok(Self::with_handler(cfg, registry, handler, queue))
    }

    /// Build an emulator around an explicit delivery handler.
    #[must_use]
    pub fn with_delivery(cfg: EmulatorConfig, handler: Arc<dyn EventHandler>) -> Self {
        let registry = Arc::new(TriggerRegistry::new(cfg.registry));
        Self::with_handler(cfg, registry, handler, None)
    }

    fn with_handler(
        cfg: EmulatorConfig,
        registry: Arc<TriggerRegistry>,
        handler: Arc<dyn EventHandler>,
        queue: Option<Arc<QueuedHandler>>,
    ) -> Self {
        let dispatcher = Arc::new(PublishDispatcher::new(Arc::clone(&registry), handler));
        Self {
            cfg,
            registry,
            dispatcher,
            queue,
            running: Mutex::new(None),
        }
    }

    /// Emulator name, always `"eventarc"`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        EMULATOR_NAME
    }

    /// Configured host and port.
    #[must_use]
    pub fn info(&self) -> EmulatorInfo {
        EmulatorInfo {
            name: self.name(),
            host: self.cfg.host.clone(),
            port: self.cfg.port,
        }
    }

    /// Shared trigger registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<TriggerRegistry> {
        &self.registry
    }

    /// Shared publish dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<PublishDispatcher> {
        &self.dispatcher
    }

    /// Router serving this emulator's state.
    #[must_use]
    pub fn router(&self) -> axum::Router {
        transport::router(AppState::new(Arc::clone(&self.dispatcher)))
    }

    /// Address bound by `start`, while running.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|r| r.local_addr)
    }

    /// Bind the configured address and serve in the background.
    ///
    /// Returns the bound address, which differs from the configured one when
    /// the configured port is 0.
    pub async fn start(&self) -> EmulatorResult<SocketAddr> {
        if let Some(addr) = self.local_addr() {
            return Err(EmulatorError::internal(format!("emulator already running on {addr}")));
        }

        let listener = TcpListener::bind((self.cfg.host.as_str(), self.cfg.port)).await?;
        let local_addr = listener.local_addr()?;
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let app = self.router();

        let join = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        *self.running.lock().unwrap_or_else(PoisonError::into_inner) = Some(Running {
            local_addr,
            shutdown,
            join,
        });

        info!(%local_addr, "Eventarc emulator listening");
        Ok(local_addr)
    }

    /// Nothing to connect to; kept for lifecycle parity with other emulators.
    pub async fn connect(&self) -> EmulatorResult<()> {
        Ok(())
    }

    /// Stop serving and wait for in-flight requests. No-op when not running.
    ///
    /// Also drains and closes the HTTP delivery queue, so an emulator that
    /// delivers to a functions emulator cannot be restarted after `stop`.
    pub async fn stop(&self) -> EmulatorResult<()> {
        let running = self.running.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(running) = running else {
            return Ok(());
        };

        let _ = running.shutdown.send(());
        match running.join.await {
            Ok(result) => result?,
            Err(e) => return Err(EmulatorError::internal(format!("server task failed: {e}"))),
        }

        if let Some(queue) = &self.queue {
            let queue = Arc::clone(queue);
            if let Err(e) = tokio::task::spawn_blocking(move || queue.shutdown()).await {
                warn!(error = %e, "Delivery queue shutdown failed");
            }
        }

        info!(local_addr = %running.local_addr, "Eventarc emulator stopped");
        Ok(())
    }
}
