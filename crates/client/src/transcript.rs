//! Flat event log → ordered transcript items.
//!
//! The log may span many runs; each `run.start` marker opens a new segment.
//! Inside a segment, items appear in the order their first event arrived,
//! so thinking, tool calls and message text interleave exactly as they
//! happened. Items live in an id → item map and the ordered list holds ids
//! only, so updates never scan the list.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use sb_domain::event::CanonicalEvent;
use sb_domain::tool::Role;

use crate::client::LoggedEvent;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Item types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One tool invocation. Never reused, even when the tool name repeats.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolExecution {
    pub tool_name: String,
    pub input: Value,
    pub output: Option<String>,
    pub status: ToolStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TranscriptItem {
    Message {
        id: String,
        role: Role,
        content: String,
        streaming: bool,
        created_at: DateTime<Utc>,
    },
    Thinking {
        id: String,
        content: String,
        streaming: bool,
        created_at: DateTime<Utc>,
    },
    Tool {
        id: String,
        execution: ToolExecution,
    },
}

impl TranscriptItem {
    pub fn id(&self) -> &str {
        match self {
            TranscriptItem::Message { id, .. }
            | TranscriptItem::Thinking { id, .. }
            | TranscriptItem::Tool { id, .. } => id,
        }
    }

    pub fn is_streaming(&self) -> bool {
        match self {
            TranscriptItem::Message { streaming, .. } | TranscriptItem::Thinking { streaming, .. } => {
                *streaming
            }
            TranscriptItem::Tool { .. } => false,
        }
    }

    fn set_streaming(&mut self, value: bool) {
        match self {
            TranscriptItem::Message { streaming, .. } | TranscriptItem::Thinking { streaming, .. } => {
                *streaming = value
            }
            TranscriptItem::Tool { .. } => {}
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Segmentation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Split the log at each `run.start` marker. Events before the first
/// marker form their own leading segment; the markers themselves are not
/// included. The reducer numbers segments the same way: the leading
/// segment is `0` and the n-th marker opens segment `n`.
pub fn segments(events: &[LoggedEvent]) -> Vec<&[LoggedEvent]> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut seen_marker = false;
    for (i, logged) in events.iter().enumerate() {
        if logged.event == CanonicalEvent::RunStart {
            if seen_marker || i > start {
                out.push(&events[start..i]);
            }
            seen_marker = true;
            start = i + 1;
        }
    }
    if seen_marker || start < events.len() {
        out.push(&events[start..]);
    }
    out
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Reducer
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Open items and counters for the segment being reduced.
#[derive(Default)]
struct SegmentState {
    open_thinking: Option<String>,
    open_message: Option<String>,
    /// Tool item ids in start order.
    tools: Vec<String>,
    thinking_count: usize,
    message_count: usize,
    tool_count: usize,
}

#[derive(Default)]
pub struct TranscriptReducer {
    order: Vec<String>,
    items: HashMap<String, TranscriptItem>,
    segment: usize,
    state: SegmentState,
}

impl TranscriptReducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reduce a whole log. `run_active` is whether the client still
    /// reports the latest run as in flight.
    pub fn reduce(events: &[LoggedEvent], run_active: bool) -> Vec<TranscriptItem> {
        let mut reducer = Self::new();
        let leading = events
            .first()
            .is_some_and(|logged| logged.event != CanonicalEvent::RunStart);
        for (i, group) in segments(events).into_iter().enumerate() {
            if i > 0 || !leading {
                reducer.start_segment();
            }
            for logged in group {
                reducer.apply(&logged.event, logged.received_at);
            }
        }
        reducer.items(run_active)
    }

    /// Close the current segment and open the next.
    pub fn start_segment(&mut self) {
        self.segment += 1;
        self.state = SegmentState::default();
    }

    /// Apply one event to the current segment.
    pub fn apply(&mut self, event: &CanonicalEvent, at: DateTime<Utc>) {
        match event {
            CanonicalEvent::RunStart => self.start_segment(),
            CanonicalEvent::ThinkingDelta { text } => {
                self.state.open_message = None;
                let id = match self.state.open_thinking.clone() {
                    Some(id) => id,
                    None => {
                        let id = format!("{}:thinking:{}", self.segment, self.state.thinking_count);
                        self.state.thinking_count += 1;
                        self.insert(
                            id.clone(),
                            TranscriptItem::Thinking {
                                id: id.clone(),
                                content: String::new(),
                                streaming: false,
                                created_at: at,
                            },
                        );
                        self.state.open_thinking = Some(id.clone());
                        id
                    }
                };
                if let Some(TranscriptItem::Thinking { content, .. }) = self.items.get_mut(&id) {
                    content.push_str(text);
                }
            }
            CanonicalEvent::MessageDelta { text } => {
                self.state.open_thinking = None;
                let id = match self.state.open_message.clone() {
                    Some(id) => id,
                    None => {
                        let id = format!("{}:message:{}", self.segment, self.state.message_count);
                        self.state.message_count += 1;
                        self.insert(
                            id.clone(),
                            TranscriptItem::Message {
                                id: id.clone(),
                                role: Role::Assistant,
                                content: String::new(),
                                streaming: false,
                                created_at: at,
                            },
                        );
                        self.state.open_message = Some(id.clone());
                        id
                    }
                };
                if let Some(TranscriptItem::Message { content, .. }) = self.items.get_mut(&id) {
                    content.push_str(text);
                }
            }
            CanonicalEvent::ToolStart { tool_name, input } => {
                self.close_text();
                let id = format!("{}:tool:{}:{}", self.segment, tool_name, self.state.tool_count);
                self.state.tool_count += 1;
                self.insert(
                    id.clone(),
                    TranscriptItem::Tool {
                        id: id.clone(),
                        execution: ToolExecution {
                            tool_name: tool_name.clone(),
                            input: input.clone(),
                            output: None,
                            status: ToolStatus::Running,
                            start_time: at,
                            end_time: None,
                        },
                    },
                );
                self.state.tools.push(id);
            }
            CanonicalEvent::ToolEnd { tool_name, output } => {
                // Most recently started still-running tool of that name.
                let matched = self.state.tools.iter().rev().find(|id| {
                    matches!(
                        self.items.get(*id),
                        Some(TranscriptItem::Tool { execution, .. })
                            if execution.tool_name == *tool_name && execution.status == ToolStatus::Running
                    )
                });
                let Some(id) = matched.cloned() else {
                    tracing::debug!(tool_name = %tool_name, "tool.end without a running tool.start, ignored");
                    return;
                };
                if let Some(TranscriptItem::Tool { execution, .. }) = self.items.get_mut(&id) {
                    execution.status = ToolStatus::Completed;
                    execution.output = Some(output.clone());
                    execution.end_time = Some(at);
                }
            }
            CanonicalEvent::MessageDone => self.close_text(),
            CanonicalEvent::Error { .. } => {
                self.close_text();
                for id in &self.state.tools {
                    if let Some(TranscriptItem::Tool { execution, .. }) = self.items.get_mut(id) {
                        if execution.status == ToolStatus::Running {
                            execution.status = ToolStatus::Failed;
                            execution.end_time = Some(at);
                        }
                    }
                }
            }
            CanonicalEvent::Meta { .. } => {}
        }
    }

    /// Ordered snapshot. Only the current segment's open thinking/message
    /// items are flagged as streaming, and only while `run_active`.
    pub fn items(&self, run_active: bool) -> Vec<TranscriptItem> {
        let open = [&self.state.open_thinking, &self.state.open_message];
        self.order
            .iter()
            .filter_map(|id| self.items.get(id))
            .map(|item| {
                let mut item = item.clone();
                let is_open = open.iter().any(|o| o.as_deref() == Some(item.id()));
                item.set_streaming(run_active && is_open);
                item
            })
            .collect()
    }

    fn insert(&mut self, id: String, item: TranscriptItem) {
        self.order.push(id.clone());
        self.items.insert(id, item);
    }

    fn close_text(&mut self) {
        self.state.open_thinking = None;
        self.state.open_message = None;
    }
}
