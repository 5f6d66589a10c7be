//! Event vocabularies.
//!
//! Two enums live here:
//!
//! - [`CanonicalEvent`]: the closed vocabulary exchanged between the
//!   orchestrator, the HTTP encoder and downstream consumers. Its serde
//!   shape is the wire format (`{"type":"message.delta",...}`).
//! - [`NativeEvent`]: what a primary agent's event source produces. The
//!   gateway maps it down and drops the kinds it has no use for.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::stream::Usage;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CanonicalEvent
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One event of a run, in the order it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CanonicalEvent {
    /// First frame of every streamed response.
    #[serde(rename = "meta")]
    Meta {
        #[serde(rename = "sessionId")]
        session_id: String,
    },

    /// Incremental assistant text.
    #[serde(rename = "message.delta")]
    MessageDelta { text: String },

    /// Incremental reasoning text.
    #[serde(rename = "thinking.delta")]
    ThinkingDelta { text: String },

    /// A tool (specialist) call has started.
    #[serde(rename = "tool.start")]
    ToolStart {
        #[serde(rename = "toolName")]
        tool_name: String,
        input: Value,
    },

    /// A tool call finished.
    #[serde(rename = "tool.end")]
    ToolEnd {
        #[serde(rename = "toolName")]
        tool_name: String,
        output: String,
    },

    /// The run produced its final message.
    #[serde(rename = "message.done")]
    MessageDone,

    /// The run failed.
    #[serde(rename = "error")]
    Error { message: String },

    /// Client-local run boundary marker. Never sent on the wire.
    #[serde(rename = "run.start")]
    RunStart,
}

impl CanonicalEvent {
    /// The `type` tag of this event as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            CanonicalEvent::Meta { .. } => "meta",
            CanonicalEvent::MessageDelta { .. } => "message.delta",
            CanonicalEvent::ThinkingDelta { .. } => "thinking.delta",
            CanonicalEvent::ToolStart { .. } => "tool.start",
            CanonicalEvent::ToolEnd { .. } => "tool.end",
            CanonicalEvent::MessageDone => "message.done",
            CanonicalEvent::Error { .. } => "error",
            CanonicalEvent::RunStart => "run.start",
        }
    }

    /// Whether this event may be framed onto the wire.
    pub fn is_wire_event(&self) -> bool {
        !matches!(self, CanonicalEvent::RunStart)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// NativeEvent
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Events produced by a primary agent's native event source.
///
/// Decodes from JSON with a `kind` tag. Kinds this enum does not know
/// decode to [`NativeEvent::Unknown`] instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NativeEvent {
    TextDelta {
        text: String,
    },
    ReasoningDelta {
        text: String,
    },
    ToolCallBegin {
        #[serde(default)]
        call_id: Option<String>,
        #[serde(default)]
        tool_name: Option<String>,
        #[serde(default)]
        input: Option<Value>,
    },
    /// Partial tool-call arguments as they stream in.
    ToolCallDelta {
        call_id: String,
        delta: String,
    },
    ToolCallEnd {
        #[serde(default)]
        call_id: Option<String>,
        tool_name: String,
        result: ToolResult,
    },
    MessageStop {
        #[serde(default)]
        finish_reason: Option<String>,
    },
    RunResult {
        #[serde(default)]
        text: String,
    },
    Usage {
        usage: Usage,
    },
    Error {
        message: String,
    },
    #[serde(other)]
    Unknown,
}

impl NativeEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            NativeEvent::TextDelta { .. } => "text-delta",
            NativeEvent::ReasoningDelta { .. } => "reasoning-delta",
            NativeEvent::ToolCallBegin { .. } => "tool-call-begin",
            NativeEvent::ToolCallDelta { .. } => "tool-call-delta",
            NativeEvent::ToolCallEnd { .. } => "tool-call-end",
            NativeEvent::MessageStop { .. } => "message-stop",
            NativeEvent::RunResult { .. } => "run-result",
            NativeEvent::Usage { .. } => "usage",
            NativeEvent::Error { .. } => "error",
            NativeEvent::Unknown => "unknown",
        }
    }
}

/// Structured result of one tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub status: ToolResultStatus,
    #[serde(default)]
    pub content: Vec<ToolResultBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolResultStatus {
    Success,
    Error,
}

/// One content block of a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolResultBlock {
    Text { text: String },
    Json { json: Value },
    Image { url: String },
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            status: ToolResultStatus::Success,
            content: vec![ToolResultBlock::Text { text: text.into() }],
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: ToolResultStatus::Error,
            content: Vec::new(),
            error: Some(message.into()),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_wire_shapes() {
        let ev = CanonicalEvent::Meta {
            session_id: "s-1".into(),
        };
        assert_eq!(
            serde_json::to_value(&ev).unwrap(),
            json!({"type": "meta", "sessionId": "s-1"})
        );

        let ev = CanonicalEvent::ToolStart {
            tool_name: "research".into(),
            input: json!({"task": "x"}),
        };
        assert_eq!(
            serde_json::to_value(&ev).unwrap(),
            json!({"type": "tool.start", "toolName": "research", "input": {"task": "x"}})
        );

        assert_eq!(
            serde_json::to_value(CanonicalEvent::MessageDone).unwrap(),
            json!({"type": "message.done"})
        );
    }

    #[test]
    fn kind_matches_serialized_tag() {
        let events = [
            CanonicalEvent::Meta { session_id: "s".into() },
            CanonicalEvent::MessageDelta { text: "a".into() },
            CanonicalEvent::ThinkingDelta { text: "b".into() },
            CanonicalEvent::ToolStart { tool_name: "t".into(), input: json!({}) },
            CanonicalEvent::ToolEnd { tool_name: "t".into(), output: "o".into() },
            CanonicalEvent::MessageDone,
            CanonicalEvent::Error { message: "m".into() },
            CanonicalEvent::RunStart,
        ];
        for ev in events {
            let v = serde_json::to_value(&ev).unwrap();
            assert_eq!(v["type"], ev.kind());
        }
    }

    #[test]
    fn run_start_is_not_a_wire_event() {
        assert!(!CanonicalEvent::RunStart.is_wire_event());
        assert!(CanonicalEvent::MessageDone.is_wire_event());
    }

    #[test]
    fn native_decodes_known_kinds() {
        let ev: NativeEvent =
            serde_json::from_value(json!({"kind": "text-delta", "text": "hi"})).unwrap();
        assert_eq!(ev, NativeEvent::TextDelta { text: "hi".into() });

        let ev: NativeEvent = serde_json::from_value(json!({
            "kind": "tool-call-end",
            "tool_name": "research",
            "result": {"status": "error", "error": "boom"}
        }))
        .unwrap();
        match ev {
            NativeEvent::ToolCallEnd { tool_name, result, .. } => {
                assert_eq!(tool_name, "research");
                assert_eq!(result.status, ToolResultStatus::Error);
                assert_eq!(result.error.as_deref(), Some("boom"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn native_tool_begin_fields_are_optional() {
        let ev: NativeEvent =
            serde_json::from_value(json!({"kind": "tool-call-begin"})).unwrap();
        assert_eq!(
            ev,
            NativeEvent::ToolCallBegin {
                call_id: None,
                tool_name: None,
                input: None
            }
        );
    }

    #[test]
    fn native_unknown_kind_decodes_to_unknown() {
        let ev: NativeEvent =
            serde_json::from_value(json!({"kind": "lifecycle-ping"})).unwrap();
        assert_eq!(ev, NativeEvent::Unknown);
    }
}
