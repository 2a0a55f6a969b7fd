//! Conversation state machine for the active session's message list.
//!
//! The app owns the local view of the conversation: replayed history, the
//! optimistic user message, the in-progress assistant message, and the turn
//! lifecycle. It performs no I/O; the turn driver in [`crate::runtime`]
//! feeds it lifecycle events.

use session_store::{Message as StoredMessage, MessageRole};
use thiserror::Error;
use time::OffsetDateTime;

pub type RunId = u64;

/// Turn lifecycle. `Failed` absorbs the turn that produced it; the next
/// submission starts a fresh turn.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Idle,
    Submitting {
        run_id: RunId,
    },
    Streaming {
        run_id: RunId,
    },
    Finalizing {
        run_id: RunId,
    },
    Failed {
        run_id: RunId,
        error: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    /// Local console notices; never sent to the gateway.
    System,
}

impl From<MessageRole> for Role {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::User => Self::User,
            MessageRole::Assistant => Self::Assistant,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    /// Seconds since the Unix epoch; absent for replayed events without one.
    pub timestamp: Option<f64>,
    pub streaming: bool,
    pub run_id: Option<RunId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    #[error("a turn is already in flight; wait for it to finish")]
    RunInProgress,
    #[error("no session is selected")]
    NoSessionSelected,
    #[error("prompt is empty")]
    EmptyPrompt,
}

#[derive(Debug, Default)]
pub struct App {
    pub mode: Mode,
    messages: Vec<ChatMessage>,
    next_run_id: RunId,
}

impl App {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Replace the message list with a session's replayed history.
    ///
    /// Only permitted between turns; the store and the turn driver never
    /// write concurrently because session switching cancels any in-flight
    /// run first.
    pub fn load_messages(&mut self, messages: Vec<StoredMessage>) {
        self.messages = messages
            .into_iter()
            .map(|message| ChatMessage {
                role: message.role.into(),
                text: message.text,
                timestamp: message.timestamp,
                streaming: false,
                run_id: None,
            })
            .collect();
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    /// Append a local console notice.
    pub fn push_notice(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage {
            role: Role::System,
            text: text.into(),
            timestamp: Some(now_epoch_seconds()),
            streaming: false,
            run_id: None,
        });
    }

    #[must_use]
    pub fn turn_in_flight(&self) -> bool {
        matches!(
            self.mode,
            Mode::Submitting { .. } | Mode::Streaming { .. } | Mode::Finalizing { .. }
        )
    }

    /// Start a turn: appends the user message optimistically, before any
    /// network confirmation, and allocates a run id stable for the run.
    pub fn begin_turn(&mut self, prompt: &str) -> Result<RunId, TurnError> {
        if self.turn_in_flight() {
            return Err(TurnError::RunInProgress);
        }

        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(TurnError::EmptyPrompt);
        }

        self.next_run_id += 1;
        let run_id = self.next_run_id;

        self.messages.push(ChatMessage {
            role: Role::User,
            text: prompt.to_string(),
            timestamp: Some(now_epoch_seconds()),
            streaming: false,
            run_id: Some(run_id),
        });
        self.mode = Mode::Submitting { run_id };

        Ok(run_id)
    }

    pub fn on_stream_opened(&mut self, run_id: RunId) {
        if self.mode == (Mode::Submitting { run_id }) {
            self.mode = Mode::Streaming { run_id };
        }
    }

    /// Apply one published snapshot to the in-progress assistant message,
    /// creating it on the first publish of the run.
    pub fn on_snapshot(&mut self, run_id: RunId, snapshot: &str) {
        if !self.applies(run_id) {
            return;
        }

        if let Some(message) = self.assistant_for_run_mut(run_id) {
            message.text = snapshot.to_string();
        } else {
            self.messages.push(ChatMessage {
                role: Role::Assistant,
                text: snapshot.to_string(),
                timestamp: Some(now_epoch_seconds()),
                streaming: true,
                run_id: Some(run_id),
            });
        }
    }

    pub fn on_finalizing(&mut self, run_id: RunId) {
        if self.applies(run_id) {
            self.mode = Mode::Finalizing { run_id };
        }
    }

    /// The run ended cleanly. The message list is retained exactly as
    /// streamed; no re-fetch from the server reorders or reformats it.
    pub fn on_turn_finished(&mut self, run_id: RunId) {
        if !self.applies(run_id) {
            return;
        }

        self.settle_stream(run_id);
        self.mode = Mode::Idle;
    }

    /// The run failed. Partial streamed content already published stays
    /// visible; the optimistic user message is not rolled back.
    pub fn on_turn_failed(&mut self, run_id: RunId, error: &str) {
        if !self.applies(run_id) {
            return;
        }

        self.settle_stream(run_id);
        self.push_notice(format!("Turn failed: {error}"));
        self.mode = Mode::Failed {
            run_id,
            error: error.to_string(),
        };
    }

    pub fn on_turn_cancelled(&mut self, run_id: RunId) {
        if !self.applies(run_id) {
            return;
        }

        self.settle_stream(run_id);
        self.push_notice("Run cancelled");
        self.mode = Mode::Idle;
    }

    #[must_use]
    pub fn assistant_text_for_run(&self, run_id: RunId) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == Role::Assistant && message.run_id == Some(run_id))
            .map(|message| message.text.as_str())
    }

    fn applies(&self, run_id: RunId) -> bool {
        matches!(
            self.mode,
            Mode::Submitting { run_id: active }
            | Mode::Streaming { run_id: active }
            | Mode::Finalizing { run_id: active }
                if active == run_id
        )
    }

    fn assistant_for_run_mut(&mut self, run_id: RunId) -> Option<&mut ChatMessage> {
        self.messages
            .iter_mut()
            .rev()
            .find(|message| message.role == Role::Assistant && message.run_id == Some(run_id))
    }

    fn settle_stream(&mut self, run_id: RunId) {
        if let Some(message) = self.assistant_for_run_mut(run_id) {
            message.streaming = false;
        }
    }
}

fn now_epoch_seconds() -> f64 {
    OffsetDateTime::now_utc().unix_timestamp() as f64
}

#[cfg(test)]
mod tests {
    use session_store::{Message as StoredMessage, MessageRole};

    use super::{App, Mode, Role, TurnError};

    #[test]
    fn begin_turn_appends_optimistic_user_message() {
        let mut app = App::new();

        let run_id = app.begin_turn("  Hi  ").expect("turn should start");

        assert_eq!(app.mode, Mode::Submitting { run_id });
        assert_eq!(app.messages().len(), 1);
        assert_eq!(app.messages()[0].role, Role::User);
        assert_eq!(app.messages()[0].text, "Hi");
    }

    #[test]
    fn second_submission_while_in_flight_is_rejected_locally() {
        let mut app = App::new();
        let run_id = app.begin_turn("Hi").expect("turn should start");
        app.on_stream_opened(run_id);

        assert_eq!(app.begin_turn("again"), Err(TurnError::RunInProgress));
        assert_eq!(app.messages().len(), 1);
    }

    #[test]
    fn blank_prompt_is_rejected() {
        let mut app = App::new();
        assert_eq!(app.begin_turn("   "), Err(TurnError::EmptyPrompt));
        assert!(app.messages().is_empty());
    }

    #[test]
    fn snapshots_create_then_replace_the_streaming_assistant_message() {
        let mut app = App::new();
        let run_id = app.begin_turn("Hi").expect("turn should start");
        app.on_stream_opened(run_id);

        app.on_snapshot(run_id, "Hel");
        app.on_snapshot(run_id, "Hello");
        app.on_snapshot(run_id, "Hello there");

        assert_eq!(app.messages().len(), 2);
        assert_eq!(app.messages()[1].role, Role::Assistant);
        assert_eq!(app.messages()[1].text, "Hello there");
        assert!(app.messages()[1].streaming);
    }

    #[test]
    fn finished_turn_settles_stream_and_returns_to_idle() {
        let mut app = App::new();
        let run_id = app.begin_turn("Hi").expect("turn should start");
        app.on_stream_opened(run_id);
        app.on_snapshot(run_id, "Hello there");

        app.on_finalizing(run_id);
        assert_eq!(app.mode, Mode::Finalizing { run_id });

        app.on_turn_finished(run_id);
        assert_eq!(app.mode, Mode::Idle);
        assert!(!app.messages()[1].streaming);
    }

    #[test]
    fn failed_turn_retains_optimistic_message_and_partial_content() {
        let mut app = App::new();
        let run_id = app.begin_turn("Hi").expect("turn should start");
        app.on_stream_opened(run_id);
        app.on_snapshot(run_id, "partial");

        app.on_turn_failed(run_id, "gateway down");

        assert!(matches!(app.mode, Mode::Failed { .. }));
        assert_eq!(app.messages()[0].text, "Hi");
        assert_eq!(app.messages()[1].text, "partial");
        assert!(!app.messages()[1].streaming);
        assert!(app
            .messages()
            .iter()
            .any(|message| message.role == Role::System
                && message.text.contains("gateway down")));
    }

    #[test]
    fn failed_state_does_not_block_the_next_turn() {
        let mut app = App::new();
        let run_id = app.begin_turn("Hi").expect("turn should start");
        app.on_turn_failed(run_id, "boom");

        assert!(app.begin_turn("retry").is_ok());
    }

    #[test]
    fn events_for_stale_runs_are_ignored() {
        let mut app = App::new();
        let first = app.begin_turn("Hi").expect("turn should start");
        app.on_turn_failed(first, "boom");
        let second = app.begin_turn("again").expect("turn should start");

        app.on_snapshot(first, "stale");
        app.on_turn_finished(first);

        assert_eq!(app.mode, Mode::Submitting { run_id: second });
        assert!(app
            .messages()
            .iter()
            .all(|message| message.text != "stale"));
    }

    #[test]
    fn cancelled_turn_returns_to_idle_with_notice() {
        let mut app = App::new();
        let run_id = app.begin_turn("Hi").expect("turn should start");
        app.on_stream_opened(run_id);
        app.on_snapshot(run_id, "par");

        app.on_turn_cancelled(run_id);

        assert_eq!(app.mode, Mode::Idle);
        assert!(app
            .messages()
            .iter()
            .any(|message| message.text == "Run cancelled"));
    }

    #[test]
    fn load_messages_replaces_the_local_list() {
        let mut app = App::new();
        app.push_notice("old");

        app.load_messages(vec![
            StoredMessage {
                role: MessageRole::User,
                text: "Hi".to_string(),
                timestamp: Some(100.0),
            },
            StoredMessage {
                role: MessageRole::Assistant,
                text: "Hello".to_string(),
                timestamp: Some(101.0),
            },
        ]);

        assert_eq!(app.messages().len(), 2);
        assert_eq!(app.messages()[0].role, Role::User);
        assert_eq!(app.messages()[1].role, Role::Assistant);
        assert!(!app.messages()[1].streaming);
    }
}
