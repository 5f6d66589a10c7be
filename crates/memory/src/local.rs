//! In-process [`MemoryProvider`], used when no memory service is configured.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use sb_domain::error::Result;

use crate::provider::MemoryProvider;
use crate::types::{MemoryRecord, MemoryRole};

/// Non-durable store ranking by query term overlap.
#[derive(Debug, Default)]
pub struct LocalMemoryStore {
    records: RwLock<Vec<MemoryRecord>>,
}

impl LocalMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Snapshot of every record for one actor, in append order.
    pub fn records_for(&self, actor_id: &str) -> Vec<MemoryRecord> {
        self.records
            .read()
            .iter()
            .filter(|r| r.actor_id == actor_id)
            .cloned()
            .collect()
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl MemoryProvider for LocalMemoryStore {
    async fn append(
        &self,
        actor_id: &str,
        session_id: &str,
        role: MemoryRole,
        text: &str,
    ) -> Result<()> {
        self.records.write().push(MemoryRecord {
            actor_id: actor_id.to_owned(),
            session_id: session_id.to_owned(),
            role,
            text: text.to_owned(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn recall(&self, actor_id: &str, query: &str, top_k: usize) -> Result<Vec<String>> {
        let query_terms = terms(query);
        if query_terms.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let records = self.records.read();
        // (score, position) so ties resolve newer-first.
        let mut scored: Vec<(usize, usize)> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.actor_id == actor_id)
            .filter_map(|(pos, r)| {
                let overlap = terms(&r.text).intersection(&query_terms).count();
                (overlap > 0).then_some((overlap, pos))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(_, pos)| records[pos].text.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn recall_ranks_by_overlap_then_recency() {
        let store = LocalMemoryStore::new();
        store.append("u1", "s1", MemoryRole::User, "I like rust and tokio").await.unwrap();
        store.append("u1", "s1", MemoryRole::Assistant, "rust is great").await.unwrap();
        store.append("u1", "s2", MemoryRole::User, "tokio rust runtime").await.unwrap();
        store.append("u1", "s2", MemoryRole::User, "nothing relevant").await.unwrap();

        let got = store.recall("u1", "Rust tokio?", 3).await.unwrap();
        assert_eq!(
            got,
            vec![
                "tokio rust runtime".to_string(),
                "I like rust and tokio".to_string(),
                "rust is great".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn recall_never_crosses_actors() {
        let store = LocalMemoryStore::new();
        store.append("alice", "s", MemoryRole::User, "secret plan").await.unwrap();
        store.append("bob", "s", MemoryRole::User, "public plan").await.unwrap();

        let got = store.recall("bob", "plan", 5).await.unwrap();
        assert_eq!(got, vec!["public plan".to_string()]);
    }

    #[tokio::test]
    async fn recall_respects_top_k() {
        let store = LocalMemoryStore::new();
        for i in 0..5 {
            store.append("u", "s", MemoryRole::User, &format!("note {i}")).await.unwrap();
        }
        assert_eq!(store.recall("u", "note", 2).await.unwrap().len(), 2);
        assert!(store.recall("u", "note", 0).await.unwrap().is_empty());
        assert!(store.recall("u", "   ", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_appends_stay_separate() {
        let store = Arc::new(LocalMemoryStore::new());
        let mut handles = Vec::new();
        for actor in ["a", "b", "c", "d"] {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..25 {
                    store
                        .append(actor, &format!("{actor}-session"), MemoryRole::User, &format!("{actor} {i}"))
                        .await
                        .unwrap();
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(store.len(), 100);
        for actor in ["a", "b", "c", "d"] {
            let recs = store.records_for(actor);
            assert_eq!(recs.len(), 25);
            assert!(recs.iter().all(|r| r.session_id == format!("{actor}-session")));
            assert!(recs.iter().all(|r| r.text.starts_with(actor)));
        }
    }
}
