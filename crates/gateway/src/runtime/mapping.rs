//! Native agent events → canonical events.

use serde_json::Value;

use sb_domain::event::{CanonicalEvent, NativeEvent, ToolResult, ToolResultBlock, ToolResultStatus};

/// Map one native event. `None` means the kind is not part of the
/// canonical vocabulary and should be dropped.
pub fn map_native(event: NativeEvent) -> Option<CanonicalEvent> {
    match event {
        NativeEvent::TextDelta { text } => Some(CanonicalEvent::MessageDelta { text }),
        NativeEvent::ReasoningDelta { text } => Some(CanonicalEvent::ThinkingDelta { text }),
        NativeEvent::ToolCallBegin { tool_name, input, .. } => Some(CanonicalEvent::ToolStart {
            tool_name: tool_name.unwrap_or_else(|| "unknown".into()),
            input: input.unwrap_or_else(|| Value::Object(Default::default())),
        }),
        NativeEvent::ToolCallEnd { tool_name, result, .. } => Some(CanonicalEvent::ToolEnd {
            tool_name,
            output: tool_output(&result),
        }),
        NativeEvent::MessageStop { .. } | NativeEvent::RunResult { .. } => {
            Some(CanonicalEvent::MessageDone)
        }
        NativeEvent::Error { message } => Some(CanonicalEvent::Error { message }),
        NativeEvent::ToolCallDelta { .. } | NativeEvent::Usage { .. } | NativeEvent::Unknown => None,
    }
}

/// Flatten a structured tool result into the `tool.end` output string.
pub fn tool_output(result: &ToolResult) -> String {
    if result.status == ToolResultStatus::Error {
        return result
            .error
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "Tool execution failed".into());
    }
    result
        .content
        .iter()
        .filter_map(|block| match block {
            ToolResultBlock::Text { text } => Some(text.clone()),
            ToolResultBlock::Json { json } => Some(json.to_string()),
            ToolResultBlock::Image { .. } => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}
