use adk_api::SessionDoc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Catalog entry for one remote session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub id: String,
    /// Seconds since the Unix epoch, as reported by the server.
    pub last_update_time: f64,
}

impl From<&SessionDoc> for SessionSummary {
    fn from(doc: &SessionDoc) -> Self {
        Self {
            id: doc.id.clone(),
            last_update_time: doc.last_update_time,
        }
    }
}

impl SessionSummary {
    /// Human-readable activity timestamp for list displays.
    #[must_use]
    pub fn last_update_label(&self) -> String {
        format_epoch_seconds(self.last_update_time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

/// Client-side rendering of one event's text content.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub text: String,
    /// Seconds since the Unix epoch; absent for events without a timestamp.
    pub timestamp: Option<f64>,
}

impl Message {
    #[must_use]
    pub fn timestamp_label(&self) -> Option<String> {
        self.timestamp.map(format_epoch_seconds)
    }
}

fn format_epoch_seconds(seconds: f64) -> String {
    OffsetDateTime::from_unix_timestamp(seconds as i64)
        .ok()
        .and_then(|moment| moment.format(&Rfc3339).ok())
        .unwrap_or_else(|| format!("{seconds:.0}"))
}
