//! Run orchestration: agent lookup, memory hooks, native → canonical mapping.

use std::sync::Arc;
use std::time::Instant;

use futures_util::StreamExt;

use sb_domain::error::{Error, Result};
use sb_domain::event::CanonicalEvent;
use sb_domain::stream::BoxStream;
use sb_domain::trace::TraceEvent;
use sb_memory::{MemoryProvider, MemoryRole};

use super::agent::{AgentBuilder, PrimaryAgent};
use super::hooks;
use super::mapping::map_native;
use super::registry::AgentRegistry;

/// Caller-supplied identifiers for one run. Blank values count as absent.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub model_id: Option<String>,
}

fn present(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Clone)]
pub struct Orchestrator {
    agents: Arc<AgentRegistry<Arc<dyn PrimaryAgent>, Arc<Error>>>,
    builder: Arc<dyn AgentBuilder>,
    memory: Option<Arc<dyn MemoryProvider>>,
    default_model: String,
    recall_top_k: usize,
}

impl Orchestrator {
    pub fn new(
        builder: Arc<dyn AgentBuilder>,
        memory: Option<Arc<dyn MemoryProvider>>,
        default_model: impl Into<String>,
        recall_top_k: usize,
    ) -> Self {
        Self {
            agents: Arc::new(AgentRegistry::new()),
            builder,
            memory,
            default_model: default_model.into(),
            recall_top_k,
        }
    }

    /// Explicit override, else the process default.
    pub fn effective_model(&self, ctx: &RunContext) -> String {
        present(&ctx.model_id)
            .unwrap_or(self.default_model.as_str())
            .to_owned()
    }

    /// Cached agent for `model_id`, built on first use. Callers racing a
    /// failed build all receive that build's error.
    pub async fn agent(&self, model_id: &str) -> std::result::Result<Arc<dyn PrimaryAgent>, Arc<Error>> {
        self.agents
            .get_or_create(model_id, || async {
                let start = Instant::now();
                let agent = self.builder.build(model_id).await.map_err(Arc::new)?;
                TraceEvent::AgentBuilt {
                    model_id: model_id.to_owned(),
                    duration_ms: start.elapsed().as_millis() as u64,
                }
                .emit();
                Ok::<_, Arc<Error>>(agent)
            })
            .await
    }

    /// Drive one run. Failures become a single trailing `Error` event.
    pub fn stream(&self, prompt: String, ctx: RunContext) -> BoxStream<'static, CanonicalEvent> {
        let this = self.clone();
        Box::pin(async_stream::stream! {
            let model_id = this.effective_model(&ctx);
            let agent = match this.agent(&model_id).await {
                Ok(agent) => agent,
                Err(e) => {
                    tracing::error!(model_id = %model_id, error = %e, "failed to build primary agent");
                    yield CanonicalEvent::Error { message: e.to_string() };
                    return;
                }
            };

            let user_id = present(&ctx.user_id).map(str::to_owned);
            let session_id = present(&ctx.session_id).map(str::to_owned);

            if let (Some(memory), Some(user), Some(session)) = (&this.memory, &user_id, &session_id) {
                hooks::spawn_record(
                    Arc::clone(memory),
                    user.clone(),
                    session.clone(),
                    MemoryRole::User,
                    prompt.clone(),
                );
            }

            let effective_prompt = match (&this.memory, &user_id) {
                (Some(memory), Some(user)) => {
                    hooks::recall_context(memory.as_ref(), user, &prompt, this.recall_top_k).await
                }
                _ => prompt.clone(),
            };

            let mut native = agent.run(effective_prompt);
            let mut message_text = String::new();

            while let Some(item) = native.next().await {
                match item {
                    Ok(event) => {
                        let kind = event.kind();
                        match map_native(event) {
                            Some(canonical) => {
                                if let CanonicalEvent::MessageDelta { text } = &canonical {
                                    message_text.push_str(text);
                                }
                                yield canonical;
                            }
                            None => TraceEvent::NativeEventDropped { kind: kind.to_owned() }.emit(),
                        }
                    }
                    Err(e) => {
                        tracing::warn!(model_id = %model_id, error = %e, "primary agent stream failed");
                        yield CanonicalEvent::Error { message: e.to_string() };
                        break;
                    }
                }
            }

            if let (Some(memory), Some(user), Some(session)) = (&this.memory, user_id, session_id) {
                if !message_text.is_empty() {
                    hooks::spawn_record(Arc::clone(memory), user, session, MemoryRole::Assistant, message_text);
                }
            }
        })
    }

    /// Run to completion and return the concatenated message text.
    pub async fn invoke(&self, prompt: String, ctx: RunContext) -> Result<String> {
        let mut events = self.stream(prompt, ctx);
        let mut text = String::new();
        let mut failure: Option<String> = None;
        while let Some(event) = events.next().await {
            match event {
                CanonicalEvent::MessageDelta { text: t } => text.push_str(&t),
                CanonicalEvent::Error { message } => {
                    failure.get_or_insert(message);
                }
                _ => {}
            }
        }
        match failure {
            Some(message) => Err(Error::Orchestration(message)),
            None => Ok(text),
        }
    }
}
