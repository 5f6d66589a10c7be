//! Streaming consumer for the Switchboard invocation endpoint.
//!
//! [`client::StreamClient`] performs runs and keeps the event log;
//! [`transcript`] turns that log into display items.

pub mod client;
pub mod transcript;

pub use client::{LoggedEvent, RunOutcome, RunRequest, StreamClient};
pub use transcript::{ToolExecution, ToolStatus, TranscriptItem, TranscriptReducer};
