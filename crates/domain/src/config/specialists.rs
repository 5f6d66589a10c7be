use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Specialists
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Delegate capabilities the primary agent can call as tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialistsConfig {
    /// Wall-clock bound for one specialist call.
    #[serde(default = "d_90")]
    pub timeout_secs: u64,
    /// Per-kind model keys. `None` uses `llm.default_model`.
    #[serde(default)]
    pub model_keys: SpecialistModelKeys,
    /// Truncation length for data/context previews in fallback text.
    #[serde(default = "d_200")]
    pub max_preview_chars: usize,
}

impl Default for SpecialistsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: d_90(),
            model_keys: SpecialistModelKeys::default(),
            max_preview_chars: d_200(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecialistModelKeys {
    #[serde(default)]
    pub research: Option<String>,
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub writing: Option<String>,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_90() -> u64 {
    90
}
fn d_200() -> usize {
    200
}
