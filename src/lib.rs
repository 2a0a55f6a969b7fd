//! Streaming chat console core.
//!
//! The console talks to an ADK-style agent gateway: one streaming run
//! endpoint plus session CRUD endpoints, both reached through the
//! `adk_api` transport crate. This crate owns everything between the wire
//! and the terminal:
//!
//! - [`transcript`] merges redelivered/overlapping deltas into one growing
//!   message;
//! - [`scheduler`] coalesces delta bursts into paced snapshot publishes;
//! - [`app`] is the per-turn conversation state machine over the local
//!   message list;
//! - [`runtime`] drives one turn end to end, suspending only at I/O;
//! - [`commands`], [`config`], and [`prefs`] form the console surface.
//!
//! Concurrency model: single-threaded and cooperative. One turn may stream
//! at a time; the session catalog (`session_store` crate) and the turn
//! driver never mutate the message list concurrently because session
//! switching cancels any in-flight run first.

pub mod app;
pub mod commands;
pub mod config;
pub mod prefs;
pub mod runtime;
pub mod scheduler;
pub mod transcript;
