//! AppState construction extracted from `main.rs`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use sb_domain::config::{Config, ConfigSeverity};
use sb_memory::create_provider as create_memory_provider;
use sb_providers::ProviderRegistry;

use crate::runtime::{LlmAgentBuilder, Orchestrator, ProviderDelegateFactory, ToolInvoker};
use crate::state::AppState;

/// Validate config, initialize every subsystem and return a fully-wired
/// [`AppState`].
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── LLM providers ────────────────────────────────────────────────
    let providers = Arc::new(ProviderRegistry::from_config(&config.llm));
    if providers.is_empty() {
        tracing::warn!("no LLM providers initialized; runs will fail and specialists will use fallbacks");
    } else {
        tracing::info!(providers = ?providers.list_providers(), "LLM providers ready");
    }

    // ── Memory collaborator ──────────────────────────────────────────
    let memory = create_memory_provider(&config.memory).context("creating memory client")?;

    // ── Specialists ──────────────────────────────────────────────────
    let invoker = Arc::new(ToolInvoker::new(
        Arc::new(ProviderDelegateFactory::new(Arc::clone(&providers))),
        Duration::from_secs(config.specialists.timeout_secs),
        config.specialists.max_preview_chars,
    ));
    tracing::info!(
        timeout_secs = config.specialists.timeout_secs,
        "specialist invoker ready"
    );

    // ── Orchestrator ─────────────────────────────────────────────────
    let builder = LlmAgentBuilder::new(providers, invoker, &config);
    let orchestrator = Orchestrator::new(
        Arc::new(builder),
        Some(memory),
        config.llm.default_model.clone(),
        config.memory.recall_top_k,
    );
    tracing::info!(default_model = %config.llm.default_model, "orchestrator ready");

    Ok(AppState::new(config, orchestrator))
}
