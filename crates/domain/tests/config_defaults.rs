use sb_domain::config::{Config, ProviderKind};

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
}

#[test]
fn empty_file_yields_all_defaults() {
    let config: Config = toml::from_str("").unwrap();
    assert_eq!(config.llm.default_model, "openai/gpt-4o-mini");
    assert_eq!(config.specialists.timeout_secs, 90);
    assert_eq!(config.specialists.max_preview_chars, 200);
    assert!(config.memory.base_url.is_none());
    assert_eq!(config.memory.recall_top_k, 3);
    assert_eq!(config.memory.timeout_ms, 8000);
    assert_eq!(config.memory.max_retries, 3);
    assert_eq!(config.agent.max_tool_loops, 10);
    assert!(config.agent.system_prompt.is_none());
    assert!(config.observability.otlp_endpoint.is_none());
}

#[test]
fn default_cors_allows_only_localhost() {
    let config = Config::default();
    assert!(config.server.cors.allowed_origins.contains(&"http://localhost:*".to_string()));
    assert!(config.server.cors.allowed_origins.contains(&"http://127.0.0.1:*".to_string()));
}

#[test]
fn full_file_parses() {
    let toml_str = r#"
[server]
host = "0.0.0.0"
port = 9000

[server.cors]
allowed_origins = ["https://myapp.com"]

[llm]
default_model = "local/llama-3.1-8b"
request_timeout_ms = 30000

[[llm.providers]]
id = "local"
base_url = "http://localhost:11434/v1"
default_model = "llama-3.1-8b"

[[llm.providers]]
id = "openai"
kind = "openai_compat"
base_url = "https://api.openai.com/v1"
auth = { env = "OPENAI_API_KEY" }

[specialists]
timeout_secs = 30
max_preview_chars = 80

[specialists.model_keys]
research = "openai/gpt-4o"

[memory]
base_url = "http://localhost:5000"
recall_top_k = 5

[agent]
system_prompt = "Be brief."
max_tool_loops = 4
temperature = 0.2
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.llm.providers.len(), 2);
    assert_eq!(config.llm.providers[0].kind, ProviderKind::OpenaiCompat);
    assert_eq!(config.llm.providers[1].auth.env.as_deref(), Some("OPENAI_API_KEY"));
    assert_eq!(config.specialists.timeout_secs, 30);
    assert_eq!(config.specialists.model_keys.research.as_deref(), Some("openai/gpt-4o"));
    assert!(config.specialists.model_keys.analysis.is_none());
    assert_eq!(config.memory.base_url.as_deref(), Some("http://localhost:5000"));
    assert_eq!(config.memory.recall_top_k, 5);
    assert_eq!(config.agent.max_tool_loops, 4);
    assert!(config.validate().is_empty());
}

#[test]
fn config_show_output_parses_back() {
    let config = Config::default();
    let rendered = toml::to_string_pretty(&config).unwrap();
    let parsed: Config = toml::from_str(&rendered).unwrap();
    assert_eq!(parsed.server.port, config.server.port);
    assert_eq!(parsed.llm.default_model, config.llm.default_model);
}
