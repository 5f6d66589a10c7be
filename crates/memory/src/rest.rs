//! REST implementation of [`MemoryProvider`].
//!
//! Retries transient failures (5xx, timeouts, connection errors) with
//! exponential back-off; 4xx responses are permanent.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use sb_domain::config::MemoryConfig;
use sb_domain::error::{Error, Result};
use sb_domain::trace::TraceEvent;
use uuid::Uuid;

use crate::provider::MemoryProvider;
use crate::types::{AppendRequest, MemoryRole, RecallRequest, RecallResponse};

/// Upper bound on a single retry delay.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Client for a remote memory service. Reuse one per process; the inner
/// `reqwest::Client` pools connections.
#[derive(Debug, Clone)]
pub struct RestMemoryClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    max_retries: u32,
}

impl RestMemoryClient {
    pub fn new(base_url: &str, cfg: &MemoryConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        let api_key = std::env::var(&cfg.api_key_env).ok().filter(|k| !k.is_empty());

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key,
            max_retries: cfg.max_retries,
        })
    }

    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        let rb = rb
            .header("X-Client-Type", "switchboard")
            .header("X-Trace-Id", Uuid::new_v4().to_string());
        match self.api_key {
            Some(ref key) => rb.header("X-Api-Key", key),
            None => rb,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Back-off before retry `attempt` (1-based): 100ms·2^(attempt-1),
    /// capped at [`MAX_BACKOFF`].
    pub(crate) fn backoff(attempt: u32) -> Duration {
        let factor = 1u64
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u64::MAX);
        Duration::from_millis(100u64.saturating_mul(factor)).min(MAX_BACKOFF)
    }

    async fn execute_with_retry(
        &self,
        endpoint: &str,
        build_request: impl Fn() -> RequestBuilder,
    ) -> Result<Response> {
        let mut last_err: Option<Error> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(Self::backoff(attempt)).await;
            }

            let start = Instant::now();
            let result = self.decorate(build_request()).send().await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(resp) => {
                    let status = resp.status();
                    TraceEvent::MemoryCall {
                        endpoint: endpoint.to_owned(),
                        status: status.as_u16(),
                        duration_ms,
                    }
                    .emit();

                    if status.is_server_error() {
                        let body = resp.text().await.unwrap_or_default();
                        last_err = Some(Error::Memory(format!(
                            "{endpoint} returned {}: {body}",
                            status.as_u16()
                        )));
                        continue;
                    }

                    if status.is_client_error() {
                        let body = resp.text().await.unwrap_or_default();
                        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                            return Err(Error::Auth(format!(
                                "{endpoint} auth failed ({}): {body}",
                                status.as_u16()
                            )));
                        }
                        return Err(Error::Memory(format!(
                            "{endpoint} returned {}: {body}",
                            status.as_u16()
                        )));
                    }

                    return Ok(resp);
                }
                Err(e) => {
                    TraceEvent::MemoryCall {
                        endpoint: endpoint.to_owned(),
                        status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                        duration_ms,
                    }
                    .emit();
                    last_err = Some(from_reqwest(e));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::Memory(format!("{endpoint}: all retries exhausted"))))
    }
}

#[async_trait]
impl MemoryProvider for RestMemoryClient {
    async fn append(
        &self,
        actor_id: &str,
        session_id: &str,
        role: MemoryRole,
        text: &str,
    ) -> Result<()> {
        let url = self.url("/api/memories");
        let body = AppendRequest {
            actor_id: actor_id.to_owned(),
            session_id: session_id.to_owned(),
            role,
            text: text.to_owned(),
        };
        self.execute_with_retry("POST /api/memories", || self.http.post(&url).json(&body))
            .await?;
        Ok(())
    }

    async fn recall(&self, actor_id: &str, query: &str, top_k: usize) -> Result<Vec<String>> {
        let url = self.url("/api/memories/recall");
        let body = RecallRequest {
            actor_id: actor_id.to_owned(),
            query: query.to_owned(),
            top_k,
        };
        let resp = self
            .execute_with_retry("POST /api/memories/recall", || self.http.post(&url).json(&body))
            .await?;

        let text = resp.text().await.map_err(from_reqwest)?;
        let parsed: RecallResponse = serde_json::from_str(&text)
            .map_err(|e| Error::Memory(format!("failed to parse recall response: {e}: {text}")))?;

        Ok(parsed
            .memories
            .into_iter()
            .map(|m| m.text)
            .take(top_k)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        assert_eq!(RestMemoryClient::backoff(1), Duration::from_millis(100));
        assert_eq!(RestMemoryClient::backoff(2), Duration::from_millis(200));
        assert_eq!(RestMemoryClient::backoff(3), Duration::from_millis(400));
    }

    #[test]
    fn backoff_is_capped_for_large_attempts() {
        assert_eq!(RestMemoryClient::backoff(9), Duration::from_millis(25_600));
        assert_eq!(RestMemoryClient::backoff(10), MAX_BACKOFF);
        assert_eq!(RestMemoryClient::backoff(65), MAX_BACKOFF);
        assert_eq!(RestMemoryClient::backoff(u32::MAX), MAX_BACKOFF);
    }

    #[test]
    fn base_url_is_normalized() {
        let client = RestMemoryClient::new("http://mem:5000/", &MemoryConfig::default()).unwrap();
        assert_eq!(client.url("/api/memories"), "http://mem:5000/api/memories");
    }
}
