//! Async turn driver: wires one streaming run through the reconciler and
//! the render scheduler into the app state machine and a presentation sink.

use std::time::Duration;

use adk_api::{
    AdkApiClient, AdkApiError, AgentRunRequest, CancellationSignal, RunEventStream,
};
use async_trait::async_trait;

use crate::app::{App, RunId, TurnError};
use crate::scheduler::{FrameRequest, RenderScheduler};

/// Default pacing for presentation refreshes while a run streams.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(50);

/// How one turn ended. All three are normal turn outcomes, not driver
/// errors; the app has already been updated when the driver returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnStatus {
    Completed,
    Failed(String),
    Cancelled,
}

/// Presentation sink receiving paced snapshots.
///
/// Snapshots are the verbatim accumulator text, monotonically non-decreasing
/// in information content; sinks decide how to render growth.
pub trait TranscriptView {
    fn publish(&mut self, run_id: RunId, snapshot: &str);

    /// The turn settled; `final_text` is exactly what streaming produced.
    fn finalize(&mut self, run_id: RunId, final_text: &str);
}

/// Gateway seam for opening one streaming run. Implemented by
/// [`AdkApiClient`] and by scripted doubles in tests.
#[async_trait]
pub trait RunTransport {
    fn app_name(&self) -> &str;

    async fn open_stream(
        &self,
        request: &AgentRunRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<RunEventStream, AdkApiError>;
}

#[async_trait]
impl RunTransport for AdkApiClient {
    fn app_name(&self) -> &str {
        AdkApiClient::app_name(self)
    }

    async fn open_stream(
        &self,
        request: &AgentRunRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<RunEventStream, AdkApiError> {
        self.open_run_stream(request, cancellation).await
    }
}

pub struct TurnDriver<T> {
    transport: T,
    frame_interval: Duration,
}

impl<T: RunTransport> TurnDriver<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            frame_interval: FRAME_INTERVAL,
        }
    }

    /// Override pacing; `Duration::ZERO` publishes every delta immediately.
    #[must_use]
    pub fn with_frame_interval(mut self, frame_interval: Duration) -> Self {
        self.frame_interval = frame_interval;
        self
    }

    /// Drive one user turn end to end.
    ///
    /// Exactly one turn may be in flight: a concurrent submission fails with
    /// [`TurnError::RunInProgress`] before anything is sent over the wire.
    pub async fn run_turn(
        &self,
        app: &mut App,
        view: &mut dyn TranscriptView,
        user_id: &str,
        session_id: &str,
        prompt: &str,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<TurnStatus, TurnError> {
        let run_id = app.begin_turn(prompt)?;
        tracing::info!(run_id, session_id, "submitting turn");

        let request = AgentRunRequest::user_text(
            self.transport.app_name(),
            user_id,
            session_id,
            prompt.trim(),
        );

        let mut stream = match self.transport.open_stream(&request, cancellation).await {
            Ok(stream) => stream,
            Err(AdkApiError::Cancelled) => {
                app.on_turn_cancelled(run_id);
                return Ok(TurnStatus::Cancelled);
            }
            Err(error) => {
                let message = error.to_string();
                tracing::warn!(run_id, %message, "streaming request rejected");
                app.on_turn_failed(run_id, &message);
                return Ok(TurnStatus::Failed(message));
            }
        };

        app.on_stream_opened(run_id);

        let mut scheduler = RenderScheduler::new();
        let status = self
            .pump_stream(&mut stream, &mut scheduler, app, view, run_id, cancellation)
            .await;

        match status {
            TurnStatus::Completed => {
                app.on_finalizing(run_id);
                if let Some(snapshot) = scheduler.finish() {
                    app.on_snapshot(run_id, snapshot);
                    view.publish(run_id, snapshot);
                }
                app.on_turn_finished(run_id);
                view.finalize(run_id, scheduler.text());
                tracing::info!(
                    run_id,
                    deltas = scheduler.delta_count(),
                    chars = scheduler.text().len(),
                    "turn completed"
                );
            }
            TurnStatus::Failed(ref message) => {
                // Published partial content stays; unflushed tail is dropped
                // with the run's accumulator.
                tracing::warn!(run_id, %message, "turn failed mid-stream");
                app.on_turn_failed(run_id, message);
            }
            TurnStatus::Cancelled => {
                tracing::info!(run_id, "turn cancelled");
                app.on_turn_cancelled(run_id);
            }
        }

        Ok(status)
    }

    /// Consume the event stream, pacing publishes onto frame boundaries.
    ///
    /// A frame is armed when the scheduler asks for one and fires once
    /// `frame_interval` has elapsed; deltas arriving in between coalesce
    /// into the next publish. The due frame wins ties so pacing holds even
    /// against a permanently ready stream.
    async fn pump_stream(
        &self,
        stream: &mut RunEventStream,
        scheduler: &mut RenderScheduler,
        app: &mut App,
        view: &mut dyn TranscriptView,
        run_id: RunId,
        cancellation: Option<&CancellationSignal>,
    ) -> TurnStatus {
        let mut frame_deadline: Option<tokio::time::Instant> = None;

        loop {
            let batch = if let Some(deadline) = frame_deadline {
                tokio::select! {
                    biased;
                    () = tokio::time::sleep_until(deadline) => {
                        frame_deadline = None;
                        if let Some(snapshot) = scheduler.on_frame() {
                            app.on_snapshot(run_id, snapshot);
                            view.publish(run_id, snapshot);
                        }
                        continue;
                    }
                    batch = stream.next_events(cancellation) => batch,
                }
            } else {
                stream.next_events(cancellation).await
            };

            match batch {
                Ok(Some(events)) => {
                    for event in &events {
                        for delta in event.text_deltas() {
                            if scheduler.on_delta(delta) == FrameRequest::Schedule {
                                frame_deadline =
                                    Some(tokio::time::Instant::now() + self.frame_interval);
                            }
                        }
                    }
                }
                Ok(None) => return TurnStatus::Completed,
                Err(AdkApiError::Cancelled) => return TurnStatus::Cancelled,
                Err(error) => return TurnStatus::Failed(error.to_string()),
            }
        }
    }
}
