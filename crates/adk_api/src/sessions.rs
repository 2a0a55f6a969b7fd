use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::EventRecord;

/// Server-authoritative session document.
///
/// List responses may omit `events`; get responses carry the full log.
/// `last_update_time` is seconds since the Unix epoch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionDoc {
    pub id: String,
    pub app_name: String,
    pub user_id: String,
    pub state: Value,
    pub events: Vec<EventRecord>,
    pub last_update_time: f64,
}
