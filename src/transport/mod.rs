//! HTTP transport for the emulator.
//!
//! Translates the Eventarc emulator routes into registry and dispatcher calls.
//! Request bodies are read as raw bytes and parsed as JSON regardless of the
//! declared content type.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::dispatch::{PublishDispatcher, PublishReport};
use crate::error::RegistryError;
use crate::event::CloudEvent;
use crate::registry::TriggerRegistry;
use crate::trigger::EventTrigger;

/// Maximum accepted request body.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024; // 10 MiB

/// Suffix of the publish route's last path segment.
const PUBLISH_EVENTS_SUFFIX: &str = ":publishEvents";

/// Route paths.
pub mod routes {
    /// Liveness check.
    pub const HELLO_WORLD: &str = "/hello_world";
    /// Trigger registration.
    pub const REGISTER_TRIGGER: &str = "/emulator/v1/projects/{project_id}/triggers/{trigger_name}";
    /// Event publishing; the last segment is `{channel}:publishEvents`.
    pub const PUBLISH_EVENTS: &str =
        "/v1/projects/{project_id}/locations/{location}/channels/{channel_action}";
}

/// Shared state handed to every route.
#[derive(Debug, Clone)]
pub struct AppState {
    registry: Arc<TriggerRegistry>,
    dispatcher: Arc<PublishDispatcher>,
}

impl AppState {
    /// State sharing the dispatcher's registry.
    #[must_use]
    pub fn new(dispatcher: Arc<PublishDispatcher>) -> Self {
        Self {
            registry: Arc::clone(dispatcher.registry()),
            dispatcher,
        }
    }
}

/// Build the emulator router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(routes::HELLO_WORLD, any(hello_world))
        .route(routes::REGISTER_TRIGGER, post(register_trigger))
        .route(routes::PUBLISH_EVENTS, post(publish_events))
        .fallback(unknown_route)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Google API style error body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn invalid_argument(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    /// The HTTP status this error maps to.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

fn canonical_status(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "INVALID_ARGUMENT",
        StatusCode::NOT_FOUND => "NOT_FOUND",
        StatusCode::CONFLICT => "ALREADY_EXISTS",
        _ => "INTERNAL",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "code": self.status.as_u16(),
                "message": self.message,
                "status": canonical_status(self.status),
            }
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        let status = match err {
            RegistryError::Invalid(_) => StatusCode::BAD_REQUEST,
            RegistryError::KeyCollision { .. } => StatusCode::CONFLICT,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterTriggerRequest {
    #[serde(default)]
    event_trigger: Option<EventTrigger>,
}

#[derive(Debug, Deserialize)]
struct PublishEventsRequest {
    #[serde(default)]
    events: Vec<Value>,
}

fn parse_json<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, ApiError> {
    serde_json::from_slice(bytes).map_err(|e| ApiError::invalid_argument(format!("invalid JSON body: {e}")))
}

/// Split `{channel}:publishEvents` into the channel.
fn parse_channel_action(segment: &str) -> Option<&str> {
    segment.strip_suffix(PUBLISH_EVENTS_SUFFIX)
}

async fn hello_world() -> StatusCode {
    StatusCode::OK
}

async fn register_trigger(
    State(state): State<AppState>,
    Path((project_id, trigger_name)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    debug!(%project_id, %trigger_name, "Received trigger registration");
    let req: RegisterTriggerRequest = parse_json(&body)?;
    state
        .registry
        .register(&project_id, &trigger_name, req.event_trigger)?;
    Ok(Json(json!({})))
}

async fn publish_events(
    State(state): State<AppState>,
    Path((project_id, location, channel_action)): Path<(String, String, String)>,
    body: Bytes,
) -> Result<(StatusCode, Json<PublishReport>), ApiError> {
    let Some(channel) = parse_channel_action(&channel_action) else {
        debug!(%channel_action, "Unknown channel action");
        return Err(ApiError::not_found(format!("unknown channel action: {channel_action}")));
    };

    let req: PublishEventsRequest = parse_json(&body)?;
    debug!(%project_id, %location, channel, events = req.events.len(), "Publishing events");

    let events = req.events.into_iter().map(CloudEvent::from_json).collect();
    let report = state.dispatcher.publish(channel, events);
    let status =
        StatusCode::from_u16(report.status.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Ok((status, Json(report)))
}

async fn unknown_route(uri: Uri) -> ApiError {
    debug!(path = %uri.path(), "Eventarc emulator received unknown request");
    ApiError::not_found(format!("no route for {}", uri.path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvalidTrigger;

    #[test]
    fn channel_action_requires_publish_suffix() {
        assert_eq!(parse_channel_action("my-channel:publishEvents"), Some("my-channel"));
        assert_eq!(parse_channel_action(":publishEvents"), Some(""));
        assert_eq!(parse_channel_action("my-channel"), None);
        assert_eq!(parse_channel_action("my-channel:publish"), None);
    }

    #[test]
    fn registry_errors_map_to_statuses() {
        let err: ApiError = RegistryError::Invalid(InvalidTrigger::EmptyProjectId).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = RegistryError::KeyCollision {
            match_key: "e-c".to_string(),
            existing: "p/a".to_string(),
            incoming: "p/b".to_string(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(canonical_status(err.status()), "ALREADY_EXISTS");
    }

    #[test]
    fn register_request_tolerates_missing_trigger() {
        let req: RegisterTriggerRequest = parse_json(br#"{"entryPoint":"fn"}"#).unwrap();
        assert!(req.event_trigger.is_none());

        let req: RegisterTriggerRequest =
            parse_json(br#"{"eventTrigger":{"eventType":"e","channel":"c"}}"#).unwrap();
        assert_eq!(req.event_trigger, Some(EventTrigger::new("e", "c")));
    }

    #[test]
    fn publish_request_defaults_to_empty_batch() {
        let req: PublishEventsRequest = parse_json(b"{}").unwrap();
        assert!(req.events.is_empty());
        assert!(parse_json::<PublishEventsRequest>(b"not json").is_err());
    }
}
