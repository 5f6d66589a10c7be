use serde::Serialize;

/// Structured trace events emitted across all Switchboard crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    InvocationReceived {
        session_id: String,
        model_id: String,
        streaming: bool,
        prompt_chars: usize,
    },
    AgentBuilt {
        model_id: String,
        duration_ms: u64,
    },
    SpecialistAttempt {
        model_key: String,
        tool: String,
        live: bool,
    },
    SpecialistOutcome {
        model_key: String,
        tool: String,
        outcome: SpecialistOutcome,
        duration_ms: u64,
    },
    MemoryCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
    LlmRequest {
        provider: String,
        model: String,
        streaming: bool,
        duration_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
    NativeEventDropped {
        kind: String,
    },
}

/// How a specialist call resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialistOutcome {
    Live,
    Fallback,
    Timeout,
    Error,
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        match self {
            TraceEvent::NativeEventDropped { .. } => {
                tracing::debug!(trace_event = %json, "sb_event");
            }
            _ => tracing::info!(trace_event = %json, "sb_event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_event_is_tagged() {
        let ev = TraceEvent::SpecialistOutcome {
            model_key: "openai/gpt-4o-mini".into(),
            tool: "research".into(),
            outcome: SpecialistOutcome::Timeout,
            duration_ms: 90_000,
        };
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["event"], "SpecialistOutcome");
        assert_eq!(v["outcome"], "timeout");
    }
}
