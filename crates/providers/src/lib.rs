pub mod openai_compat;
pub mod registry;
pub mod traits;
pub(crate) mod sse;
pub mod util;

pub use registry::{ProviderRegistry, ResolvedModel};
pub use traits::{ChatRequest, ChatResponse, LlmProvider};
