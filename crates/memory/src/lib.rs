//! `sb-memory`: the conversation-memory collaborator.
//!
//! [`MemoryProvider`] is the seam the orchestrator talks to. Two
//! implementations ship here:
//!
//! | config                | implementation        |
//! |-----------------------|-----------------------|
//! | `memory.base_url` set | [`RestMemoryClient`]  |
//! | unset                 | [`LocalMemoryStore`]  |

pub mod local;
pub mod provider;
pub mod rest;
pub mod types;

pub use local::LocalMemoryStore;
pub use provider::MemoryProvider;
pub use rest::{from_reqwest, RestMemoryClient};
pub use types::{MemoryRecord, MemoryRole};

use std::sync::Arc;

use sb_domain::config::MemoryConfig;
use sb_domain::error::Result;

/// Build the [`MemoryProvider`] the config asks for.
pub fn create_provider(cfg: &MemoryConfig) -> Result<Arc<dyn MemoryProvider>> {
    match cfg.base_url.as_deref() {
        Some(url) => {
            let client = RestMemoryClient::new(url, cfg)?;
            tracing::info!(base_url = %url, "using REST memory service");
            Ok(Arc::new(client))
        }
        None => {
            tracing::info!("no memory service configured, using in-process store");
            Ok(Arc::new(LocalMemoryStore::new()))
        }
    }
}
