use std::time::Duration;

use crate::url::DEFAULT_BASE_URL;

/// Transport configuration for agent gateway requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdkApiConfig {
    /// Identifier of the agent application served by the gateway.
    pub app_name: String,
    /// Base URL for gateway endpoints.
    pub base_url: String,
    /// Optional request timeout applied to non-streaming calls.
    pub timeout: Option<Duration>,
}

impl Default for AdkApiConfig {
    fn default() -> Self {
        Self {
            app_name: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
        }
    }
}

impl AdkApiConfig {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
