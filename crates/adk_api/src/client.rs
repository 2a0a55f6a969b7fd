use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::config::AdkApiConfig;
use crate::error::{parse_error_message, AdkApiError};
use crate::events::EventRecord;
use crate::payload::AgentRunRequest;
use crate::sessions::SessionDoc;
use crate::sse::SseStreamParser;
use crate::url::{run_sse_url, session_url, sessions_url};

/// Optional cancellation signal shared across request and stream loops.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone)]
pub struct AdkApiClient {
    http: Client,
    config: AdkApiConfig,
}

impl AdkApiClient {
    pub fn new(config: AdkApiConfig) -> Result<Self, AdkApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(AdkApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &AdkApiConfig {
        &self.config
    }

    pub fn app_name(&self) -> &str {
        &self.config.app_name
    }

    /// Create a session, forwarding a client-generated candidate identifier.
    ///
    /// The identifier echoed back by the server is authoritative; callers
    /// must read it from the returned document rather than assume the
    /// candidate was accepted as-is.
    pub async fn create_session(
        &self,
        user_id: &str,
        candidate_id: &str,
    ) -> Result<SessionDoc, AdkApiError> {
        let url = session_url(
            &self.config.base_url,
            &self.config.app_name,
            user_id,
            candidate_id,
        );
        tracing::debug!(user_id, candidate_id, "creating session");
        let response = self.http.post(url).json(&serde_json::json!({})).send().await?;
        read_json(response).await
    }

    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionDoc>, AdkApiError> {
        let url = sessions_url(&self.config.base_url, &self.config.app_name, user_id);
        let response = self.http.get(url).send().await?;
        read_json(response).await
    }

    pub async fn get_session(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<SessionDoc, AdkApiError> {
        let url = session_url(
            &self.config.base_url,
            &self.config.app_name,
            user_id,
            session_id,
        );
        let response = self.http.get(url).send().await?;
        read_json(response).await
    }

    pub async fn delete_session(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<(), AdkApiError> {
        let url = session_url(
            &self.config.base_url,
            &self.config.app_name,
            user_id,
            session_id,
        );
        tracing::debug!(user_id, session_id, "deleting session");
        let response = self.http.delete(url).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    /// Open one streaming run and return its decoded event stream.
    ///
    /// Fails fast with [`AdkApiError::StreamTransport`] when the request is
    /// rejected before any event is produced; a stream that simply ends is
    /// the normal termination signal, not an error.
    pub async fn open_run_stream(
        &self,
        request: &AgentRunRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<RunEventStream, AdkApiError> {
        let url = run_sse_url(&self.config.base_url);
        tracing::debug!(session_id = %request.session_id, "opening streaming run");

        let send = self.http.post(url).json(request).send();
        let response = match await_or_cancel(send, cancellation).await? {
            Ok(response) => response,
            Err(error) => return Err(stream_transport(error)),
        };

        let status = response.status();
        if !status.is_success() {
            let body = await_or_cancel(response.text(), cancellation)
                .await?
                .unwrap_or_default();
            return Err(AdkApiError::StreamTransport {
                status: Some(status),
                message: parse_error_message(status, &body),
            });
        }

        Ok(RunEventStream::from_response(response))
    }
}

/// Decoded view over one streaming run's response body.
pub struct RunEventStream {
    chunks: BoxStream<'static, Result<Vec<u8>, AdkApiError>>,
    parser: SseStreamParser,
    finished: bool,
}

impl std::fmt::Debug for RunEventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunEventStream")
            .field("parser", &self.parser)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl RunEventStream {
    fn from_response(response: Response) -> Self {
        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(stream_transport))
            .boxed();

        Self {
            chunks,
            parser: SseStreamParser::default(),
            finished: false,
        }
    }

    /// Deterministic stream double fed from pre-recorded chunks.
    ///
    /// Chunk boundaries are preserved exactly as provided, which makes this
    /// the vehicle for exercising framing behavior without a live gateway.
    pub fn scripted<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        Self::scripted_outcomes(chunks.into_iter().map(Ok))
    }

    /// Scripted double with explicit per-chunk outcomes, for exercising
    /// mid-stream transport failure.
    pub fn scripted_outcomes<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Result<Vec<u8>, AdkApiError>>,
    {
        let chunks: Vec<Result<Vec<u8>, AdkApiError>> = chunks.into_iter().collect();

        Self {
            chunks: futures_util::stream::iter(chunks).boxed(),
            parser: SseStreamParser::default(),
            finished: false,
        }
    }

    /// Await the next non-empty batch of decoded events.
    ///
    /// Returns `Ok(None)` once the underlying stream has ended and residual
    /// buffered content has been flushed.
    pub async fn next_events(
        &mut self,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Option<Vec<EventRecord>>, AdkApiError> {
        if self.finished {
            return Ok(None);
        }

        loop {
            let chunk = await_or_cancel(self.chunks.next(), cancellation).await?;
            match chunk {
                Some(chunk) => {
                    let events = self.parser.feed(&chunk?);
                    if !events.is_empty() {
                        return Ok(Some(events));
                    }
                }
                None => {
                    self.finished = true;
                    let residual = self.parser.finish();
                    return if residual.is_empty() {
                        Ok(None)
                    } else {
                        Ok(Some(residual))
                    };
                }
            }
        }
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, AdkApiError> {
    let response = ensure_success(response).await?;
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(AdkApiError::from)
}

async fn ensure_success(response: Response) -> Result<Response, AdkApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(AdkApiError::Status(
        status,
        parse_error_message(status, &body),
    ))
}

fn stream_transport(error: reqwest::Error) -> AdkApiError {
    AdkApiError::StreamTransport {
        status: error.status(),
        message: error.to_string(),
    }
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, AdkApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(AdkApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(AdkApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}
