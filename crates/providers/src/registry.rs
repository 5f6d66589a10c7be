//! Provider registry.
//!
//! Holds every configured LLM provider instance and resolves
//! `provider/model` ids to a provider plus the model name to send.

use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::LlmProvider;
use sb_domain::config::{split_model_id, LlmConfig, ProviderKind};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A provider together with the model name to request from it.
#[derive(Clone)]
pub struct ResolvedModel {
    pub provider: Arc<dyn LlmProvider>,
    pub model: String,
}

#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
}

impl ProviderRegistry {
    /// Build the registry from the [`LlmConfig`].
    ///
    /// Providers that fail to initialize (usually a missing API key) are
    /// logged and skipped rather than aborting startup.
    pub fn from_config(config: &LlmConfig) -> Self {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();

        for pc in &config.providers {
            let result = match pc.kind {
                ProviderKind::OpenaiCompat => OpenAiCompatProvider::from_config(pc, timeout)
                    .map(|p| Arc::new(p) as Arc<dyn LlmProvider>),
            };

            match result {
                Ok(provider) => {
                    tracing::info!(provider_id = %pc.id, kind = ?pc.kind, "registered LLM provider");
                    providers.insert(pc.id.clone(), provider);
                }
                Err(e) => {
                    tracing::warn!(
                        provider_id = %pc.id,
                        kind = ?pc.kind,
                        error = %e,
                        "failed to initialize LLM provider, skipping"
                    );
                }
            }
        }

        if providers.is_empty() {
            tracing::warn!("no LLM providers initialized; specialists will answer with fallback text");
        }

        Self { providers }
    }

    /// Registry over already-built providers.
    pub fn from_providers(list: impl IntoIterator<Item = Arc<dyn LlmProvider>>) -> Self {
        let providers = list
            .into_iter()
            .map(|p| (p.provider_id().to_string(), p))
            .collect();
        Self { providers }
    }

    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(provider_id).cloned()
    }

    /// Resolve a model id.
    ///
    /// `provider/model` selects that provider. A bare model name is only
    /// resolvable when exactly one provider is registered.
    pub fn resolve(&self, model_id: &str) -> Option<ResolvedModel> {
        match split_model_id(model_id) {
            (Some(provider_id), model) => self.get(provider_id).map(|provider| ResolvedModel {
                provider,
                model: model.to_string(),
            }),
            (None, model) if self.providers.len() == 1 => {
                self.providers.values().next().map(|provider| ResolvedModel {
                    provider: provider.clone(),
                    model: model.to_string(),
                })
            }
            (None, _) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// All registered provider ids, sorted.
    pub fn list_providers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{ChatRequest, ChatResponse};
    use sb_domain::config::{AuthConfig, ProviderConfig};
    use sb_domain::error::{Error, Result};
    use sb_domain::stream::{BoxStream, StreamEvent};

    struct Named(&'static str);

    #[async_trait::async_trait]
    impl LlmProvider for Named {
        async fn chat(&self, _req: &ChatRequest) -> Result<ChatResponse> {
            Err(Error::Other("unused".into()))
        }
        async fn chat_stream(
            &self,
            _req: &ChatRequest,
        ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
            Err(Error::Other("unused".into()))
        }
        fn provider_id(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn resolves_prefixed_model_ids() {
        let reg = ProviderRegistry::from_providers([
            Arc::new(Named("openai")) as Arc<dyn LlmProvider>,
            Arc::new(Named("local")) as Arc<dyn LlmProvider>,
        ]);
        let r = reg.resolve("local/llama3").unwrap();
        assert_eq!(r.provider.provider_id(), "local");
        assert_eq!(r.model, "llama3");
        assert!(reg.resolve("missing/x").is_none());
        assert!(reg.resolve("gpt-4o").is_none());
    }

    #[test]
    fn bare_model_uses_the_only_provider() {
        let reg = ProviderRegistry::from_providers([Arc::new(Named("openai")) as Arc<dyn LlmProvider>]);
        let r = reg.resolve("gpt-4o").unwrap();
        assert_eq!(r.provider.provider_id(), "openai");
        assert_eq!(r.model, "gpt-4o");
    }

    #[test]
    fn failing_provider_is_skipped() {
        let config = LlmConfig {
            providers: vec![
                ProviderConfig {
                    id: "broken".into(),
                    kind: ProviderKind::OpenaiCompat,
                    base_url: "https://example.invalid/v1".into(),
                    auth: AuthConfig {
                        env: Some("SB_TEST_REGISTRY_MISSING_KEY_5521".into()),
                        ..Default::default()
                    },
                    default_model: None,
                },
                ProviderConfig {
                    id: "local".into(),
                    kind: ProviderKind::OpenaiCompat,
                    base_url: "http://localhost:11434/v1".into(),
                    auth: AuthConfig::default(),
                    default_model: None,
                },
            ],
            ..Default::default()
        };
        let reg = ProviderRegistry::from_config(&config);
        assert_eq!(reg.list_providers(), vec!["local".to_string()]);
    }
}
