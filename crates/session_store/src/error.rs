use adk_api::AdkApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("failed to create session: {source}")]
    Create {
        #[source]
        source: AdkApiError,
    },

    #[error("failed to list sessions: {source}")]
    List {
        #[source]
        source: AdkApiError,
    },

    #[error("failed to load session '{session_id}': {source}")]
    Get {
        session_id: String,
        #[source]
        source: AdkApiError,
    },

    #[error("session '{session_id}' was not found")]
    NotFound { session_id: String },

    #[error("failed to delete session '{session_id}': {source}")]
    Delete {
        session_id: String,
        #[source]
        source: AdkApiError,
    },
}
