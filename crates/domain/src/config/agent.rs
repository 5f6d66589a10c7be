use serde::{Deserialize, Serialize};

/// Primary coordinating agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Replaces the built-in coordinator system prompt when set.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Upper bound on model→tools→model round trips per run.
    #[serde(default = "d_10")]
    pub max_tool_loops: usize,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_tool_loops: d_10(),
            temperature: None,
        }
    }
}

fn d_10() -> usize {
    10
}
