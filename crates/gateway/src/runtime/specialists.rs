//! Specialist capabilities (research, analysis, writing) exposed to the
//! primary agent as tools, plus the deterministic fallback text used when
//! a live specialist is unavailable.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use sb_domain::config::Config;
use sb_domain::error::{Error, Result};
use sb_domain::tool::{Message, ToolDefinition};
use sb_providers::{ChatRequest, ProviderRegistry};

/// Appended to every fallback answer.
pub const FALLBACK_NOTE: &str =
    "Note: the live specialist was unavailable, so this is an offline summary of the request.";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SpecialistKind
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialistKind {
    Research,
    Analysis,
    Writing,
}

impl SpecialistKind {
    pub const ALL: [SpecialistKind; 3] = [
        SpecialistKind::Research,
        SpecialistKind::Analysis,
        SpecialistKind::Writing,
    ];

    /// Tool name the primary agent calls.
    pub fn tool_name(self) -> &'static str {
        match self {
            SpecialistKind::Research => "research",
            SpecialistKind::Analysis => "analyze",
            SpecialistKind::Writing => "write",
        }
    }

    pub fn from_tool_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tool_name() == name)
    }

    fn headline(self) -> &'static str {
        match self {
            SpecialistKind::Research => "Research findings for",
            SpecialistKind::Analysis => "Analysis results for",
            SpecialistKind::Writing => "Written draft for",
        }
    }

    fn description(self) -> &'static str {
        match self {
            SpecialistKind::Research => {
                "Delegate a research question. Returns findings with supporting detail."
            }
            SpecialistKind::Analysis => {
                "Delegate analysis of supplied data. Returns observations and conclusions."
            }
            SpecialistKind::Writing => {
                "Delegate a writing task. Returns a polished draft in the requested language."
            }
        }
    }

    pub fn system_prompt(self) -> &'static str {
        match self {
            SpecialistKind::Research => {
                "You are a research specialist. Answer the task with concise, \
                 well-organised findings. State uncertainty plainly."
            }
            SpecialistKind::Analysis => {
                "You are an analysis specialist. Examine the supplied data and \
                 context, then report the key observations and conclusions."
            }
            SpecialistKind::Writing => {
                "You are a writing specialist. Produce a clear, well-structured \
                 draft for the task, honouring the requested language."
            }
        }
    }

    /// Model key configured for this kind, falling back to the llm default.
    pub fn model_key(self, config: &Config) -> String {
        let keys = &config.specialists.model_keys;
        let key = match self {
            SpecialistKind::Research => keys.research.as_ref(),
            SpecialistKind::Analysis => keys.analysis.as_ref(),
            SpecialistKind::Writing => keys.writing.as_ref(),
        };
        config.specialist_model_key(key).to_owned()
    }

    pub fn tool_definition(self) -> ToolDefinition {
        ToolDefinition {
            name: self.tool_name().into(),
            description: self.description().into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "task": { "type": "string", "description": "What the specialist should do." },
                    "data": { "description": "Optional supporting data, any JSON value." },
                    "context": { "type": "string", "description": "Optional prior notes." },
                    "language": { "type": "string", "description": "Optional output language hint." }
                },
                "required": ["task"]
            }),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request + fallback
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpecialistRequest {
    pub task: String,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl SpecialistRequest {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            data: None,
            context: None,
            language: None,
        }
    }

    /// Decode tool-call arguments. A missing or blank `task` is rejected.
    pub fn from_arguments(args: &Value) -> Result<Self> {
        let req: Self = serde_json::from_value(args.clone())
            .map_err(|e| Error::Other(format!("invalid specialist arguments: {e}")))?;
        if req.task.trim().is_empty() {
            return Err(Error::Other("specialist task must not be empty".into()));
        }
        Ok(req)
    }

    /// User message sent to a live specialist.
    fn to_prompt(&self) -> String {
        let mut out = format!("Task: {}", self.task);
        if let Some(data) = &self.data {
            out.push_str("\n\nData:\n");
            out.push_str(&value_text(data));
        }
        if let Some(ctx) = &self.context {
            out.push_str("\n\nContext:\n");
            out.push_str(ctx);
        }
        if let Some(lang) = &self.language {
            out.push_str("\n\nRespond in: ");
            out.push_str(lang);
        }
        out
    }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Truncate on a char boundary, marking the cut with `…`.
fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_owned(),
    }
}

/// Offline answer built purely from the request.
pub fn fallback_text(kind: SpecialistKind, req: &SpecialistRequest, max_preview: usize) -> String {
    let mut lines = vec![format!("{}: {}", kind.headline(), req.task)];
    if let Some(data) = &req.data {
        lines.push(format!("Data: {}", preview(&value_text(data), max_preview)));
    }
    if let Some(ctx) = req.context.as_deref().filter(|c| !c.is_empty()) {
        lines.push(format!("Context: {}", preview(ctx, max_preview)));
    }
    if let Some(lang) = req.language.as_deref().filter(|l| !l.is_empty()) {
        lines.push(format!("Language: {lang}"));
    }
    lines.push(FALLBACK_NOTE.to_owned());
    lines.join("\n")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Live delegates
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A live specialist bound to one model key.
#[async_trait]
pub trait Specialist: Send + Sync {
    async fn call(&self, kind: SpecialistKind, req: &SpecialistRequest) -> Result<String>;
}

/// Builds the live specialist for a model key. `Ok(None)` means no live
/// capability is configured for it.
#[async_trait]
pub trait DelegateFactory: Send + Sync {
    async fn build(&self, model_key: &str) -> Result<Option<Arc<dyn Specialist>>>;
}

/// Resolves model keys against the configured LLM providers.
pub struct ProviderDelegateFactory {
    providers: Arc<ProviderRegistry>,
}

impl ProviderDelegateFactory {
    pub fn new(providers: Arc<ProviderRegistry>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl DelegateFactory for ProviderDelegateFactory {
    async fn build(&self, model_key: &str) -> Result<Option<Arc<dyn Specialist>>> {
        if self.providers.is_empty() {
            return Ok(None);
        }
        let resolved = self.providers.resolve(model_key).ok_or_else(|| Error::Delegate {
            delegate: model_key.to_owned(),
            message: "no provider serves this model".into(),
        })?;
        Ok(Some(Arc::new(LlmSpecialist {
            provider: resolved.provider,
            model: resolved.model,
        })))
    }
}

/// Specialist answering with one non-streaming chat completion.
pub struct LlmSpecialist {
    provider: Arc<dyn sb_providers::LlmProvider>,
    model: String,
}

#[async_trait]
impl Specialist for LlmSpecialist {
    async fn call(&self, kind: SpecialistKind, req: &SpecialistRequest) -> Result<String> {
        let request = ChatRequest {
            messages: vec![
                Message::system(kind.system_prompt()),
                Message::user(req.to_prompt()),
            ],
            model: Some(self.model.clone()),
            ..Default::default()
        };
        let resp = self.provider.chat(&request).await?;
        Ok(resp.content)
    }
}
