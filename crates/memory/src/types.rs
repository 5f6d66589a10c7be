//! Memory DTOs. Field names are `camelCase` on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a remembered turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryRole {
    User,
    Assistant,
}

/// One stored conversation turn. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
    pub actor_id: String,
    pub session_id: String,
    pub role: MemoryRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// POST /api/memories: request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendRequest {
    pub actor_id: String,
    pub session_id: String,
    pub role: MemoryRole,
    pub text: String,
}

/// POST /api/memories/recall: request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallRequest {
    pub actor_id: String,
    pub query: String,
    pub top_k: usize,
}

/// POST /api/memories/recall: response body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallResponse {
    #[serde(default)]
    pub memories: Vec<RecalledMemory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalledMemory {
    pub text: String,
    #[serde(default)]
    pub score: Option<f64>,
}
