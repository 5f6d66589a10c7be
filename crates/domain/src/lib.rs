//! Shared domain types for Switchboard: event vocabularies, wire framing,
//! LLM message/stream types, configuration and the common error type.

pub mod config;
pub mod error;
pub mod event;
pub mod frame;
pub mod stream;
pub mod tool;
pub mod trace;

pub use error::{Error, Result};
