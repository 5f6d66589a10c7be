use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM providers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Process-wide default model id, `provider_id/model_name`.
    #[serde(default = "d_default_model")]
    pub default_model: String,
    #[serde(default = "d_20000u")]
    pub request_timeout_ms: u64,
    /// Registered providers. Adding a provider is adding config.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_model: d_default_model(),
            request_timeout_ms: d_20000u(),
            providers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    #[serde(default)]
    pub kind: ProviderKind,
    pub base_url: String,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    OpenaiCompat,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Header name (default `Authorization`).
    #[serde(default)]
    pub header: Option<String>,
    /// Header value prefix (default `Bearer `).
    #[serde(default)]
    pub prefix: Option<String>,
    /// Env var containing the key.
    #[serde(default)]
    pub env: Option<String>,
    /// Direct key, for config-only setups.
    #[serde(default)]
    pub key: Option<String>,
}

/// Split a model id of the form `provider/model` into its halves.
///
/// An id without a slash names a model on whichever provider is asked.
pub fn split_model_id(model_id: &str) -> (Option<&str>, &str) {
    match model_id.split_once('/') {
        Some((provider, model)) if !provider.is_empty() => (Some(provider), model),
        _ => (None, model_id),
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_default_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn d_20000u() -> u64 {
    20_000
}
