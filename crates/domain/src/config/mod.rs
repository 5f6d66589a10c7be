mod agent;
mod llm;
mod memory;
mod observability;
mod server;
mod specialists;

pub use agent::*;
pub use llm::*;
pub use memory::*;
pub use observability::*;
pub use server::*;
pub use specialists::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub specialists: SpecialistsConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Model key a specialist kind resolves to.
    pub fn specialist_model_key<'a>(&'a self, key: Option<&'a String>) -> &'a str {
        key.map(String::as_str)
            .filter(|k| !k.is_empty())
            .unwrap_or(self.llm.default_model.as_str())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { severity: ConfigSeverity::Error, field: field.into(), message: message.into() }
    }

    fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { severity: ConfigSeverity::Warning, field: field.into(), message: message.into() }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return every issue found.
    ///
    /// An empty vec means the config is usable as-is.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }

        if self.llm.providers.is_empty() {
            errors.push(ConfigError::warning(
                "llm.providers",
                "no LLM providers configured; specialists will use fallback text",
            ));
        }
        for (i, provider) in self.llm.providers.iter().enumerate() {
            if provider.id.is_empty() {
                errors.push(ConfigError::error(
                    format!("llm.providers[{i}].id"),
                    "provider id must not be empty",
                ));
            }
            if provider.base_url.is_empty() {
                errors.push(ConfigError::error(
                    format!("llm.providers[{i}].base_url"),
                    "provider base_url must not be empty",
                ));
            }
        }

        if self.specialists.timeout_secs == 0 {
            errors.push(ConfigError::error(
                "specialists.timeout_secs",
                "timeout must be greater than 0",
            ));
        }

        if self.memory.recall_top_k == 0 {
            errors.push(ConfigError::error(
                "memory.recall_top_k",
                "recall_top_k must be greater than 0",
            ));
        }
        if matches!(self.memory.base_url.as_deref(), Some("")) {
            errors.push(ConfigError::error(
                "memory.base_url",
                "base_url must not be empty when set",
            ));
        }

        if self.server.cors.is_wildcard() {
            errors.push(ConfigError::warning(
                "server.cors.allowed_origins",
                "wildcard \"*\" allows all origins (not recommended for production)",
            ));
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_only_the_no_provider_warning() {
        let issues = Config::default().validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, ConfigSeverity::Warning);
        assert_eq!(issues[0].field, "llm.providers");
    }

    #[test]
    fn zero_values_are_errors() {
        let mut cfg = Config::default();
        cfg.server.port = 0;
        cfg.specialists.timeout_secs = 0;
        cfg.memory.recall_top_k = 0;
        let fields: Vec<_> = cfg
            .validate()
            .into_iter()
            .filter(|e| e.severity == ConfigSeverity::Error)
            .map(|e| e.field)
            .collect();
        assert!(fields.contains(&"server.port".to_string()));
        assert!(fields.contains(&"specialists.timeout_secs".to_string()));
        assert!(fields.contains(&"memory.recall_top_k".to_string()));
    }

    #[test]
    fn provider_fields_are_checked_by_index() {
        let mut cfg = Config::default();
        cfg.llm.providers.push(ProviderConfig {
            id: String::new(),
            kind: ProviderKind::OpenaiCompat,
            base_url: String::new(),
            auth: AuthConfig::default(),
            default_model: None,
        });
        let fields: Vec<_> = cfg.validate().into_iter().map(|e| e.field).collect();
        assert!(fields.contains(&"llm.providers[0].id".to_string()));
        assert!(fields.contains(&"llm.providers[0].base_url".to_string()));
        assert!(!fields.contains(&"llm.providers".to_string()));
    }

    #[test]
    fn display_format() {
        let e = ConfigError::error("server.port", "bad");
        assert_eq!(e.to_string(), "[ERROR] server.port: bad");
        let w = ConfigError::warning("x", "y");
        assert_eq!(w.to_string(), "[WARN] x: y");
    }

    #[test]
    fn specialist_model_key_falls_back_to_default() {
        let mut cfg = Config::default();
        assert_eq!(cfg.specialist_model_key(None), "openai/gpt-4o-mini");
        cfg.specialists.model_keys.research = Some("local/llama".into());
        assert_eq!(
            cfg.specialist_model_key(cfg.specialists.model_keys.research.as_ref()),
            "local/llama"
        );
        let empty = String::new();
        assert_eq!(cfg.specialist_model_key(Some(&empty)), "openai/gpt-4o-mini");
    }
}
