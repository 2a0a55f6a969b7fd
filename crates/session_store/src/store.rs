use adk_api::{AdkApiClient, AdkApiError, SessionDoc};
use async_trait::async_trait;
use uuid::Uuid;

use crate::error::SessionStoreError;
use crate::replay::messages_from_events;
use crate::schema::{Message, SessionSummary};

/// Gateway surface the store needs. Implemented by [`AdkApiClient`] and by
/// in-memory doubles in tests.
#[async_trait]
pub trait SessionApi {
    async fn create_session(
        &self,
        user_id: &str,
        candidate_id: &str,
    ) -> Result<SessionDoc, AdkApiError>;

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionDoc>, AdkApiError>;

    async fn get_session(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<SessionDoc, AdkApiError>;

    async fn delete_session(&self, user_id: &str, session_id: &str)
        -> Result<(), AdkApiError>;
}

#[async_trait]
impl SessionApi for AdkApiClient {
    async fn create_session(
        &self,
        user_id: &str,
        candidate_id: &str,
    ) -> Result<SessionDoc, AdkApiError> {
        AdkApiClient::create_session(self, user_id, candidate_id).await
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionDoc>, AdkApiError> {
        AdkApiClient::list_sessions(self, user_id).await
    }

    async fn get_session(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<SessionDoc, AdkApiError> {
        AdkApiClient::get_session(self, user_id, session_id).await
    }

    async fn delete_session(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<(), AdkApiError> {
        AdkApiClient::delete_session(self, user_id, session_id).await
    }
}

/// Catalog of one user's remote sessions plus the local selection.
///
/// The server is authoritative for membership and ordering inputs; this
/// store owns only presentation ordering (most recently active first) and
/// the selection policy.
pub struct SessionStore<C> {
    api: C,
    user_id: String,
    sessions: Vec<SessionSummary>,
    selected: Option<String>,
}

impl<C: SessionApi> SessionStore<C> {
    pub fn new(api: C, user_id: impl Into<String>) -> Self {
        Self {
            api,
            user_id: user_id.into(),
            sessions: Vec::new(),
            selected: None,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Catalog entries, most recently active first.
    pub fn sessions(&self) -> &[SessionSummary] {
        &self.sessions
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Select a session already present in the catalog.
    pub fn select(&mut self, session_id: &str) -> bool {
        if self.contains(session_id) {
            self.selected = Some(session_id.to_string());
            true
        } else {
            false
        }
    }

    /// Create a session, forwarding a fresh v4 candidate identifier and
    /// trusting the server's echoed identifier.
    pub async fn create(&mut self) -> Result<SessionSummary, SessionStoreError> {
        let candidate = Uuid::new_v4().to_string();
        let doc = self
            .api
            .create_session(&self.user_id, &candidate)
            .await
            .map_err(|source| SessionStoreError::Create { source })?;

        let summary = SessionSummary::from(&doc);
        tracing::info!(session_id = %summary.id, "created session");

        self.sessions.retain(|existing| existing.id != summary.id);
        self.sessions.insert(0, summary.clone());
        self.sort_by_recency();
        self.apply_default_selection();

        Ok(summary)
    }

    /// Reconcile the catalog against the server's session list.
    pub async fn refresh(&mut self) -> Result<&[SessionSummary], SessionStoreError> {
        let docs = self
            .api
            .list_sessions(&self.user_id)
            .await
            .map_err(|source| SessionStoreError::List { source })?;

        self.sessions = docs.iter().map(SessionSummary::from).collect();
        self.sort_by_recency();

        if let Some(selected) = self.selected.clone() {
            if !self.contains(&selected) {
                tracing::debug!(session_id = %selected, "selected session vanished from server list");
                self.selected = None;
            }
        }
        self.apply_default_selection();

        Ok(&self.sessions)
    }

    /// Load one session's full event history, select it, and return its
    /// translated message list.
    pub async fn open(&mut self, session_id: &str) -> Result<Vec<Message>, SessionStoreError> {
        let doc = match self.api.get_session(&self.user_id, session_id).await {
            Ok(doc) => doc,
            Err(source) if source.is_not_found() => {
                return Err(SessionStoreError::NotFound {
                    session_id: session_id.to_string(),
                })
            }
            Err(source) => {
                return Err(SessionStoreError::Get {
                    session_id: session_id.to_string(),
                    source,
                })
            }
        };

        self.selected = Some(doc.id.clone());
        Ok(messages_from_events(&doc.events))
    }

    /// Delete a session. Deleting an already-deleted session is success by
    /// policy; only transport failures surface as errors.
    pub async fn delete(&mut self, session_id: &str) -> Result<(), SessionStoreError> {
        match self.api.delete_session(&self.user_id, session_id).await {
            Ok(()) => {}
            Err(source) if source.is_not_found() => {
                tracing::debug!(session_id, "deleting unknown session treated as success");
            }
            Err(source) => {
                return Err(SessionStoreError::Delete {
                    session_id: session_id.to_string(),
                    source,
                })
            }
        }

        self.sessions.retain(|session| session.id != session_id);
        if self.selected.as_deref() == Some(session_id) {
            self.selected = None;
            self.apply_default_selection();
        }

        Ok(())
    }

    fn contains(&self, session_id: &str) -> bool {
        self.sessions.iter().any(|session| session.id == session_id)
    }

    fn sort_by_recency(&mut self) {
        // Stable sort: equal timestamps keep server arrival order.
        self.sessions
            .sort_by(|a, b| b.last_update_time.total_cmp(&a.last_update_time));
    }

    fn apply_default_selection(&mut self) {
        if self.selected.is_none() {
            self.selected = self.sessions.first().map(|session| session.id.clone());
        }
    }
}

