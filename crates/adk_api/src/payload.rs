use serde::{Deserialize, Serialize};

/// Request payload for one streaming run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRunRequest {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
    pub new_message: NewMessage,
    pub streaming: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub role: String,
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePart {
    pub text: String,
}

impl AgentRunRequest {
    /// Builds the canonical user-turn request with streaming enabled.
    pub fn user_text(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
            new_message: NewMessage {
                role: "user".to_string(),
                parts: vec![MessagePart { text: text.into() }],
            },
            streaming: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AgentRunRequest;

    #[test]
    fn user_text_request_serializes_wire_field_names() {
        let request = AgentRunRequest::user_text("support", "u-1", "s-9", "Hi");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["app_name"], "support");
        assert_eq!(value["user_id"], "u-1");
        assert_eq!(value["session_id"], "s-9");
        assert_eq!(value["streaming"], true);
        assert_eq!(value["new_message"]["role"], "user");
        assert_eq!(value["new_message"]["parts"][0]["text"], "Hi");
    }
}
