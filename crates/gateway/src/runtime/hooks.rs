//! Best-effort memory side effects around a run.
//!
//! Nothing here can fail the run: writes are detached tasks that log and
//! swallow errors, and a failed recall leaves the prompt unchanged.

use std::sync::Arc;

use tokio::task::JoinHandle;

use sb_memory::{MemoryProvider, MemoryRole};

/// Persist one turn message in the background.
pub fn spawn_record(
    memory: Arc<dyn MemoryProvider>,
    actor_id: String,
    session_id: String,
    role: MemoryRole,
    text: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = memory.append(&actor_id, &session_id, role, &text).await {
            tracing::warn!(
                actor_id = %actor_id,
                session_id = %session_id,
                role = ?role,
                error = %e,
                "memory append failed"
            );
        }
    })
}

/// Prompt with recalled context prepended, or the prompt as-is when recall
/// fails or finds nothing. A snippet identical to the prompt is skipped,
/// since the user turn may already have been recorded.
pub async fn recall_context(
    memory: &dyn MemoryProvider,
    actor_id: &str,
    prompt: &str,
    top_k: usize,
) -> String {
    // One extra slot in case the just-recorded prompt comes back.
    match memory.recall(actor_id, prompt, top_k.saturating_add(1)).await {
        Ok(mut snippets) => {
            snippets.retain(|s| s != prompt);
            snippets.truncate(top_k);
            augment_prompt(&snippets, prompt)
        }
        Err(e) => {
            tracing::warn!(actor_id, error = %e, "memory recall failed, using bare prompt");
            prompt.to_owned()
        }
    }
}

pub fn augment_prompt(snippets: &[String], prompt: &str) -> String {
    if snippets.is_empty() {
        return prompt.to_owned();
    }
    let mut out = String::from("Relevant context from previous conversations:\n");
    for s in snippets {
        out.push_str("- ");
        out.push_str(s);
        out.push('\n');
    }
    out.push('\n');
    out.push_str(prompt);
    out
}
