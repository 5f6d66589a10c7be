//! The primary coordinating agent.
//!
//! A [`PrimaryAgent`] turns a prompt into a stream of [`NativeEvent`]s.
//! [`LlmAgent`] is the production implementation: it streams completions
//! from an LLM provider and runs the specialist tools the model asks for,
//! feeding their results back until the model answers without tool calls.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::Instrument;

use sb_domain::config::Config;
use sb_domain::error::{Error, Result};
use sb_domain::event::{NativeEvent, ToolResultStatus};
use sb_domain::stream::{BoxStream, StreamEvent};
use sb_domain::tool::{Message, ToolCall};
use sb_domain::trace::TraceEvent;
use sb_providers::{ChatRequest, LlmProvider, ProviderRegistry};

use super::invoker::ToolInvoker;
use super::mapping::tool_output;
use super::tools::SpecialistTools;

const DEFAULT_SYSTEM_PROMPT: &str = "You are Switchboard, a coordinating assistant. \
Answer directly when you can. When a request needs deeper work, delegate it to the \
research, analyze or write tools and combine their results into one clear answer.";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Traits
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A ready-to-run primary agent bound to one model.
pub trait PrimaryAgent: Send + Sync {
    /// Drive one run. The stream is finite; an `Err` item ends it.
    fn run(&self, prompt: String) -> BoxStream<'static, Result<NativeEvent>>;
}

/// Constructs primary agents per model id.
#[async_trait]
pub trait AgentBuilder: Send + Sync {
    async fn build(&self, model_id: &str) -> Result<Arc<dyn PrimaryAgent>>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LlmAgentBuilder
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct LlmAgentBuilder {
    providers: Arc<ProviderRegistry>,
    tools: Arc<SpecialistTools>,
    system_prompt: String,
    max_tool_loops: usize,
    temperature: Option<f32>,
}

impl LlmAgentBuilder {
    pub fn new(providers: Arc<ProviderRegistry>, invoker: Arc<ToolInvoker>, config: &Config) -> Self {
        Self {
            providers,
            tools: Arc::new(SpecialistTools::from_config(invoker, config)),
            system_prompt: config
                .agent
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_owned()),
            max_tool_loops: config.agent.max_tool_loops.max(1),
            temperature: config.agent.temperature,
        }
    }
}

#[async_trait]
impl AgentBuilder for LlmAgentBuilder {
    async fn build(&self, model_id: &str) -> Result<Arc<dyn PrimaryAgent>> {
        let resolved = self.providers.resolve(model_id).ok_or_else(|| Error::Provider {
            provider: model_id.to_owned(),
            message: format!(
                "no provider serves model '{model_id}' (configured: {:?})",
                self.providers.list_providers()
            ),
        })?;
        Ok(Arc::new(LlmAgent {
            provider: resolved.provider,
            model: resolved.model,
            tools: Arc::clone(&self.tools),
            system_prompt: self.system_prompt.clone(),
            max_tool_loops: self.max_tool_loops,
            temperature: self.temperature,
        }))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LlmAgent
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Clone)]
pub struct LlmAgent {
    provider: Arc<dyn LlmProvider>,
    model: String,
    tools: Arc<SpecialistTools>,
    system_prompt: String,
    max_tool_loops: usize,
    temperature: Option<f32>,
}

impl LlmAgent {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        tools: Arc<SpecialistTools>,
        max_tool_loops: usize,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            tools,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
            max_tool_loops: max_tool_loops.max(1),
            temperature: None,
        }
    }
}

impl PrimaryAgent for LlmAgent {
    fn run(&self, prompt: String) -> BoxStream<'static, Result<NativeEvent>> {
        let agent = self.clone();
        Box::pin(async_stream::stream! {
            let tool_defs = agent.tools.definitions();
            let mut messages = vec![Message::system(agent.system_prompt.clone()), Message::user(prompt)];

            for loop_idx in 0..agent.max_tool_loops {
                tracing::debug!(loop_idx, "tool loop iteration");

                let req = ChatRequest {
                    messages: messages.clone(),
                    tools: (*tool_defs).clone(),
                    temperature: agent.temperature,
                    max_tokens: None,
                    model: Some(agent.model.clone()),
                };

                let started = Instant::now();
                let mut stream = match agent.provider.chat_stream(&req).await {
                    Ok(s) => s,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                let mut text_buf = String::new();
                let mut pending_tool_calls: Vec<ToolCall> = Vec::new();

                while let Some(item) = stream.next().await {
                    let event = match item {
                        Ok(ev) => ev,
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    };
                    match event {
                        StreamEvent::Token { text } => {
                            text_buf.push_str(&text);
                            yield Ok(NativeEvent::TextDelta { text });
                        }
                        StreamEvent::Thinking { text } => {
                            yield Ok(NativeEvent::ReasoningDelta { text });
                        }
                        StreamEvent::ToolCallStarted { .. } => {}
                        StreamEvent::ToolCallDelta { call_id, delta } => {
                            yield Ok(NativeEvent::ToolCallDelta { call_id, delta });
                        }
                        StreamEvent::ToolCallFinished { call_id, tool_name, arguments } => {
                            pending_tool_calls.push(ToolCall { call_id, tool_name, arguments });
                        }
                        StreamEvent::Done { usage, .. } => {
                            TraceEvent::LlmRequest {
                                provider: agent.provider.provider_id().to_owned(),
                                model: agent.model.clone(),
                                streaming: true,
                                duration_ms: started.elapsed().as_millis() as u64,
                                prompt_tokens: usage.as_ref().map(|u| u.prompt_tokens),
                                completion_tokens: usage.as_ref().map(|u| u.completion_tokens),
                            }
                            .emit();
                            if let Some(usage) = usage {
                                yield Ok(NativeEvent::Usage { usage });
                            }
                        }
                        StreamEvent::Error { message } => {
                            yield Ok(NativeEvent::Error { message });
                            return;
                        }
                    }
                }

                if pending_tool_calls.is_empty() {
                    yield Ok(NativeEvent::RunResult { text: text_buf });
                    return;
                }

                messages.push(Message::assistant_tool_calls(&text_buf, &pending_tool_calls));

                for tc in &pending_tool_calls {
                    yield Ok(NativeEvent::ToolCallBegin {
                        call_id: Some(tc.call_id.clone()),
                        tool_name: Some(tc.tool_name.clone()),
                        input: Some(tc.arguments.clone()),
                    });
                }

                // Dispatch concurrently; join_all keeps call order.
                let tool_futures: Vec<_> = pending_tool_calls
                    .iter()
                    .map(|tc| {
                        let tool_span = tracing::info_span!(
                            "tool.call",
                            tool_name = %tc.tool_name,
                            call_id = %tc.call_id,
                        );
                        agent.tools.dispatch(tc).instrument(tool_span)
                    })
                    .collect();
                let tool_results = futures_util::future::join_all(tool_futures).await;

                for (tc, result) in pending_tool_calls.iter().zip(tool_results) {
                    let is_error = result.status == ToolResultStatus::Error;
                    messages.push(Message::tool_result(&tc.call_id, tool_output(&result), is_error));
                    yield Ok(NativeEvent::ToolCallEnd {
                        call_id: Some(tc.call_id.clone()),
                        tool_name: tc.tool_name.clone(),
                        result,
                    });
                }
            }

            yield Ok(NativeEvent::Error {
                message: format!("tool loop limit reached ({} iterations)", agent.max_tool_loops),
            });
        })
    }
}
