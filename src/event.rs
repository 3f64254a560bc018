//! Published CloudEvents.
//!
//! Only `type` is interpreted. Every other attribute is carried opaquely and
//! forwarded to the handler unchanged.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A published event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudEvent {
    /// The event `type`. Non-string values are treated as absent.
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub event_type: Option<String>,

    /// Remaining attributes (`id`, `source`, `specversion`, `data`, extensions).
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        _ => None,
    })
}

impl CloudEvent {
    /// Create an event of the given type with no other attributes.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: Some(event_type.into()),
            attributes: Map::new(),
        }
    }

    /// Add an opaque attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Build an event from one element of a publish request.
    ///
    /// Never fails: anything that is not an object becomes an event without a
    /// type, so a single malformed element cannot sink the rest of the batch.
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(mut attributes) => {
                let event_type = match attributes.remove("type") {
                    Some(Value::String(s)) => Some(s),
                    _ => None,
                };
                Self {
                    event_type,
                    attributes,
                }
            }
            _ => Self::default(),
        }
    }

    /// The event type, if present and non-empty.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.event_type.as_deref().filter(|t| !t.is_empty())
    }

    /// The `id` attribute, when it is a string.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.attributes.get("id").and_then(Value::as_str)
    }

    /// Serialize back to a JSON object (the delivery payload).
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut out = self.attributes.clone();
        if let Some(t) = &self.event_type {
            out.insert("type".to_string(), Value::String(t.clone()));
        }
        Value::Object(out)
    }
}

/// Events published together to one channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishBatch {
    /// Channel from the request path; empty is the default channel.
    pub channel: String,
    /// Events in publish order.
    pub events: Vec<CloudEvent>,
}

impl PublishBatch {
    /// Create a batch.
    #[must_use]
    pub fn new(channel: impl Into<String>, events: Vec<CloudEvent>) -> Self {
        Self {
            channel: channel.into(),
            events,
        }
    }
}
