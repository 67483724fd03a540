//! Console Binding
//!
//! A [`Platform`] that prints responses to stdout and turns stdin lines into
//! message events. Used for trying commands locally without a chat client.

mod platform;

pub use platform::{ConsolePlatform, CONSOLE_CHANNEL_ID, CONSOLE_USER_ID};

use crate::domain::entities::InboundEvent;

/// Turn one input line into an event.
///
/// Lines starting with `{` are read as a JSON-encoded [`InboundEvent`], which
/// is how interactions and server context are simulated. Anything else is a
/// message from the console user. Blank and malformed lines yield `None`.
pub fn line_to_event(line: &str, message_id: i64) -> Option<InboundEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if line.starts_with('{') {
        return match serde_json::from_str::<InboundEvent>(line) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed event");
                None
            }
        };
    }

    Some(InboundEvent::message(CONSOLE_USER_ID, CONSOLE_CHANNEL_ID, line).with_message_id(message_id))
}
