//! Switchboard gateway: HTTP surface, runtime and CLI for the
//! multi-agent orchestrator.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod runtime;
pub mod state;
