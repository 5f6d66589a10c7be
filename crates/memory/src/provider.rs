//! The `MemoryProvider` trait: the conversation-memory collaborator.

use async_trait::async_trait;
use sb_domain::error::Result;

use crate::types::MemoryRole;

/// Append-only conversation memory keyed by actor.
///
/// Implementations must accept concurrent appends for distinct
/// `(actor_id, session_id)` pairs, and `recall` must never return
/// another actor's records.
#[async_trait]
pub trait MemoryProvider: Send + Sync {
    /// Store one conversation turn.
    async fn append(
        &self,
        actor_id: &str,
        session_id: &str,
        role: MemoryRole,
        text: &str,
    ) -> Result<()>;

    /// Up to `top_k` texts for `actor_id`, most relevant to `query` first.
    async fn recall(&self, actor_id: &str, query: &str, top_k: usize) -> Result<Vec<String>>;
}
