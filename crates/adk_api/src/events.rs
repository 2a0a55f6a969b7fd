use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One atomic unit of conversation history.
///
/// The same record shape is used for events streamed from an in-flight run
/// and for events persisted inside a session document. Every field is
/// optional on the wire; records missing the pieces a consumer needs simply
/// contribute nothing to that consumer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventRecord {
    pub id: Option<String>,
    pub author: Option<String>,
    pub timestamp: Option<f64>,
    pub content: Option<EventContent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventContent {
    pub parts: Vec<Part>,
    pub role: Option<String>,
}

/// One piece of an event's content. Exactly one shape per part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: FunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: FunctionResponse,
    },
    /// Part shape this client does not model; preserved for inspection.
    Other(Value),
}

impl Part {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionCall {
    pub id: Option<String>,
    pub name: String,
    pub args: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionResponse {
    pub id: Option<String>,
    pub name: String,
    pub response: Value,
}

impl EventRecord {
    /// Text part values under `content.parts`, in part order.
    pub fn text_deltas(&self) -> impl Iterator<Item = &str> {
        self.content
            .iter()
            .flat_map(|content| content.parts.iter())
            .filter_map(Part::as_text)
    }

    /// Concatenation of all text parts; `None` when no text part exists.
    #[must_use]
    pub fn joined_text(&self) -> Option<String> {
        let mut joined = String::new();
        for delta in self.text_deltas() {
            joined.push_str(delta);
        }

        if joined.is_empty() {
            None
        } else {
            Some(joined)
        }
    }
}
