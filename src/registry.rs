//! In-memory trigger registry.
//!
//! Maps each [`MatchKey`] to the single trigger currently registered for it.
//! The map lives behind an `RwLock`: registrations are exclusive, lookups run
//! in parallel, and the last completed registration for a key wins.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{InvalidTrigger, RegistryError};
use crate::trigger::{EventTrigger, MatchKey, TriggerEntry};

/// What to do when a registration targets a key held by another trigger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Replace the previous trigger silently.
    #[default]
    Overwrite,
    /// Refuse the registration with `RegistryError::KeyCollision`.
    Reject,
}

/// Registry configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Key collision handling.
    #[serde(default)]
    pub collision_policy: CollisionPolicy,
}

/// Keyed store of event triggers.
#[derive(Debug, Default)]
pub struct TriggerRegistry {
    cfg: RegistryConfig,
    entries: RwLock<HashMap<MatchKey, Arc<TriggerEntry>>>,
}

impl TriggerRegistry {
    /// Empty registry applying `cfg`.
    #[must_use]
    pub fn new(cfg: RegistryConfig) -> Self {
        Self {
            cfg,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The policy this registry applies on key collisions.
    #[must_use]
    pub const fn collision_policy(&self) -> CollisionPolicy {
        self.cfg.collision_policy
    }

    /// Register (or re-register) a trigger.
    ///
    /// Fails with `InvalidTrigger` and leaves the registry untouched when the
    /// trigger is absent or has no event type.
    pub fn register(
        &self,
        project_id: &str,
        trigger_name: &str,
        event_trigger: Option<EventTrigger>,
    ) -> Result<(), RegistryError> {
        let Some(event_trigger) = event_trigger else {
            debug!(trigger_name, "Missing event trigger");
            return Err(InvalidTrigger::MissingEventTrigger {
                trigger_name: trigger_name.to_string(),
            }
            .into());
        };
        if event_trigger.event_type.is_empty() {
            debug!(trigger_name, "Missing event type");
            return Err(InvalidTrigger::MissingEventType {
                trigger_name: trigger_name.to_string(),
            }
            .into());
        }
        if project_id.is_empty() {
            return Err(InvalidTrigger::EmptyProjectId.into());
        }
        if trigger_name.is_empty() {
            return Err(InvalidTrigger::EmptyTriggerName.into());
        }

        let key = event_trigger.match_key();
        let entry = Arc::new(TriggerEntry {
            project_id: project_id.to_string(),
            trigger_name: trigger_name.to_string(),
            event_trigger,
            registered_at: Utc::now(),
        });

        // Single insert under the write lock: a poisoned lock cannot hold a partial entry.
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(previous) = entries.get(&key) {
            if !previous.same_owner(&entry) {
                if self.cfg.collision_policy == CollisionPolicy::Reject {
                    return Err(RegistryError::KeyCollision {
                        match_key: key.to_string(),
                        existing: previous.qualified_name(),
                        incoming: entry.qualified_name(),
                    });
                }
                info!(
                    match_key = %key,
                    previous = %previous.qualified_name(),
                    trigger = %entry.qualified_name(),
                    "Replacing custom event trigger"
                );
            }
        }

        info!(match_key = %key, trigger = %entry.qualified_name(), "Registering custom event trigger");
        entries.insert(key, entry);
        Ok(())
    }

    /// The trigger registered for `key`, if any.
    #[must_use]
    pub fn lookup(&self, key: &MatchKey) -> Option<Arc<TriggerEntry>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Number of keys with a registered trigger.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True when no trigger is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
