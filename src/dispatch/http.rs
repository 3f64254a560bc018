//! HTTP delivery to a locally running functions emulator.
//!
//! Each delivery is POSTed as the CloudEvent JSON object to
//! `{base_url}/functions/projects/{project_id}/triggers/{trigger_name}`.
//! Requests are blocking, so this handler belongs behind a
//! [`QueuedHandler`](super::QueuedHandler) whose worker thread absorbs the I/O.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Url;

use crate::error::DeliveryError;

use super::handler::{Delivery, EventHandler};

/// Where and how long to deliver.
#[derive(Debug, Clone)]
pub struct HttpFunctionConfig {
    /// Base URL of the functions emulator, e.g. `http://127.0.0.1:5001`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// POSTs deliveries to the functions emulator.
#[derive(Debug)]
pub struct HttpFunctionHandler {
    cfg: HttpFunctionConfig,
    // Built on first use so construction never happens inside an async runtime.
    client: OnceLock<Result<Client, String>>,
}

impl HttpFunctionHandler {
    /// Handler for `cfg`. No connection is made until the first delivery.
    #[must_use]
    pub fn new(cfg: HttpFunctionConfig) -> Self {
        Self {
            cfg,
            client: OnceLock::new(),
        }
    }

    /// Target URL for a trigger.
    ///
    /// Project and trigger names are appended as single percent-encoded
    /// path segments.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Unreachable` when the base URL cannot be
    /// parsed or cannot carry a path.
    pub fn trigger_url(&self, project_id: &str, trigger_name: &str) -> Result<Url, DeliveryError> {
        let invalid = |reason: String| DeliveryError::Unreachable {
            message: format!("invalid functions url {:?}: {reason}", self.cfg.base_url),
        };
        let mut url = Url::parse(&self.cfg.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("not a base url".to_string()))?
            .pop_if_empty()
            .extend(["functions", "projects", project_id, "triggers", trigger_name]);
        Ok(url)
    }

    fn client(&self) -> Result<&Client, DeliveryError> {
        self.client
            .get_or_init(|| {
                Client::builder()
                    .timeout(self.cfg.timeout)
                    .build()
                    .map_err(|e| e.to_string())
            })
            .as_ref()
            .map_err(|message| DeliveryError::Unreachable {
                message: message.clone(),
            })
    }
}

impl EventHandler for HttpFunctionHandler {
    fn deliver(&self, delivery: Delivery) -> Result<(), DeliveryError> {
        let url = self.trigger_url(&delivery.project_id, &delivery.trigger_name)?;
        let response = self
            .client()?
            .post(url)
            .json(&delivery.event.to_json())
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout {
                        duration_ms: u64::try_from(self.cfg.timeout.as_millis()).unwrap_or(u64::MAX),
                    }
                } else {
                    DeliveryError::Unreachable {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}
