//! Transport-only agent gateway client primitives.
//!
//! This crate owns request/response building and stream decoding for the
//! gateway's run and session endpoints only. It intentionally contains no
//! session catalog policy and no console/runtime coupling: higher layers
//! decide ordering, selection, and how decoded events become messages.
//!
//! Streaming behavior: the SSE parser tolerates malformed `data:` lines
//! (dropped, never fatal) and flushes residual content at stream end, since
//! the gateway does not guarantee a terminating blank line.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod payload;
pub mod sessions;
pub mod sse;
pub mod url;

pub use client::{AdkApiClient, CancellationSignal, RunEventStream};
pub use reqwest::StatusCode;
pub use config::AdkApiConfig;
pub use error::AdkApiError;
pub use events::{EventContent, EventRecord, FunctionCall, FunctionResponse, Part};
pub use payload::{AgentRunRequest, MessagePart, NewMessage};
pub use sessions::SessionDoc;
pub use sse::SseStreamParser;
pub use url::{normalize_base_url, DEFAULT_BASE_URL};
