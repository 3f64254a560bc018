//! Trigger types for the registry.
//!
//! A trigger is a registered interest in events of one type on one channel.
//! The `(event_type, channel)` pair is collapsed into a [`MatchKey`], which is
//! the only thing the dispatcher ever compares.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Event-matching criteria of a trigger.
///
/// Missing or `null` fields deserialize as empty strings; an empty
/// `event_type` is rejected at registration time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTrigger {
    /// Kind of event the trigger wants.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub event_type: String,
    /// Logical bus partition the trigger listens on; empty is the default channel.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub channel: String,
}

// Proto3 JSON encodes an unset string field as either an absent key or `null`.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl EventTrigger {
    /// Create criteria for `event_type` on `channel`.
    #[must_use]
    pub fn new(event_type: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            channel: channel.into(),
        }
    }

    /// The key this trigger is stored under.
    #[must_use]
    pub fn match_key(&self) -> MatchKey {
        MatchKey::new(&self.event_type, &self.channel)
    }
}

/// Registry key: `event_type + "-" + channel`, composed verbatim.
///
/// The composition is observable (two pairs that compose to the same string
/// collide), so it must never be trimmed or normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchKey(String);

impl MatchKey {
    /// Compose the key for an event type published on a channel.
    #[must_use]
    pub fn new(event_type: &str, channel: &str) -> Self {
        let mut key = String::with_capacity(event_type.len() + channel.len() + 1);
        key.push_str(event_type);
        key.push('-');
        key.push_str(channel);
        Self(key)
    }

    /// The composed key string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MatchKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A stored registration.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEntry {
    pub project_id: String,
    pub trigger_name: String,
    pub event_trigger: EventTrigger,
    pub registered_at: DateTime<Utc>,
}

impl TriggerEntry {
    /// `project_id/trigger_name`, used in logs and collision errors.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.project_id, self.trigger_name)
    }

    /// True when both entries belong to the same `(project, trigger)`,
    /// whatever their criteria.
    #[must_use]
    pub fn same_owner(&self, other: &Self) -> bool {
        self.project_id == other.project_id && self.trigger_name == other.trigger_name
    }
}
