//! Core runtime: the pieces between an HTTP request and the canonical
//! event stream.
//!
//! Leaves first: [`registry`] (single-flight cache) → [`specialists`] +
//! [`invoker`] (bounded specialist calls) → [`tools`] + [`agent`] (the
//! primary agent's tool loop) → [`mapping`] + [`hooks`] → [`orchestrator`].

pub mod agent;
pub mod hooks;
pub mod invoker;
pub mod mapping;
pub mod orchestrator;
pub mod registry;
pub mod specialists;
pub mod tools;

pub use agent::{AgentBuilder, LlmAgent, LlmAgentBuilder, PrimaryAgent};
pub use invoker::ToolInvoker;
pub use orchestrator::{Orchestrator, RunContext};
pub use registry::AgentRegistry;
pub use specialists::{
    fallback_text, DelegateFactory, ProviderDelegateFactory, Specialist, SpecialistKind,
    SpecialistRequest,
};
