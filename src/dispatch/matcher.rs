//! Match-key resolution.

use crate::error::InvalidEvent;
use crate::event::CloudEvent;
use crate::trigger::MatchKey;

/// Resolve the key an event published on `channel` is matched under.
///
/// `index` is the event's position in its batch and only feeds the error.
pub fn resolve_match_key(
    event: &CloudEvent,
    channel: &str,
    index: usize,
) -> Result<MatchKey, InvalidEvent> {
    let event_type = event.kind().ok_or(InvalidEvent::MissingType { index })?;
    Ok(MatchKey::new(event_type, channel))
}
