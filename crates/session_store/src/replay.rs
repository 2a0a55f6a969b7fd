use adk_api::EventRecord;

use crate::schema::{Message, MessageRole};

/// Translate a session's persisted event log into the ordered message list.
///
/// Only text parts are rendered: an event whose parts are all tool calls or
/// tool results yields no message. Authors other than the end user (the
/// agent itself and any named tool) map to the assistant role.
pub fn messages_from_events(events: &[EventRecord]) -> Vec<Message> {
    events.iter().filter_map(message_from_event).collect()
}

fn message_from_event(event: &EventRecord) -> Option<Message> {
    let text = event.joined_text()?;
    let role = match event.author.as_deref() {
        Some("user") => MessageRole::User,
        _ => MessageRole::Assistant,
    };

    Some(Message {
        role,
        text,
        timestamp: event.timestamp,
    })
}
