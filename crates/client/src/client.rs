//! Consumer side of `POST /invocations`.
//!
//! [`StreamClient`] owns an append-only event log shared by every run it
//! performs. Starting a run cancels the one in flight, then appends a local
//! `run.start` marker so run boundaries survive in the flat log. Frames are
//! decoded as bytes arrive and appended in arrival order; frames from a
//! cancelled run are discarded.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reqwest::header::ACCEPT;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use sb_domain::error::{Error, Result};
use sb_domain::event::CanonicalEvent;
use sb_domain::frame::{decode_payload, FrameDecoder};

use crate::transcript::{TranscriptItem, TranscriptReducer};

const BROADCAST_CAPACITY: usize = 256;

/// One log entry with its local arrival time.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedEvent {
    pub event: CanonicalEvent,
    pub received_at: DateTime<Utc>,
}

/// Parameters for one run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

impl RunRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }
}

/// How a run ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Cancelled,
}

#[derive(Default)]
struct ClientState {
    log: Vec<LoggedEvent>,
    session_id: Option<String>,
    error: Option<String>,
    running: bool,
    /// Token of the latest run.
    cancel: Option<CancellationToken>,
    run_seq: u64,
}

fn transport(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Transport(e.to_string())
    }
}

/// Cancellable streaming client. Clones share one log.
#[derive(Clone)]
pub struct StreamClient {
    http: reqwest::Client,
    endpoint: String,
    state: Arc<Mutex<ClientState>>,
    events_tx: broadcast::Sender<LoggedEvent>,
}

impl StreamClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:8080`.
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(transport)?;
        let (events_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Ok(Self {
            http,
            endpoint: format!("{}/invocations", base_url.trim_end_matches('/')),
            state: Arc::new(Mutex::new(ClientState::default())),
            events_tx,
        })
    }

    // ── Observers ────────────────────────────────────────────────────

    /// Live feed of every event appended to the log.
    pub fn subscribe(&self) -> broadcast::Receiver<LoggedEvent> {
        self.events_tx.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Session id from the latest `meta` frame.
    pub fn session_id(&self) -> Option<String> {
        self.state.lock().session_id.clone()
    }

    /// Visible error of the latest run, if any.
    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn events(&self) -> Vec<LoggedEvent> {
        self.state.lock().log.clone()
    }

    pub fn transcript(&self) -> Vec<TranscriptItem> {
        let state = self.state.lock();
        TranscriptReducer::reduce(&state.log, state.running)
    }

    // ── Control ──────────────────────────────────────────────────────

    /// Cancel the run in flight. Not an error; late frames are dropped.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        if let Some(token) = state.cancel.take() {
            token.cancel();
        }
        state.running = false;
    }

    /// Perform one run to completion, cancellation or failure.
    ///
    /// Transport failures (connect errors, non-2xx, broken streams) are
    /// returned as `Err` and also recorded as the visible error.
    pub async fn run(&self, mut req: RunRequest) -> Result<RunOutcome> {
        let token = CancellationToken::new();
        let seq = {
            let mut state = self.state.lock();
            if let Some(prev) = state.cancel.replace(token.clone()) {
                prev.cancel();
            }
            state.run_seq += 1;
            state.running = true;
            state.error = None;
            if req.session_id.is_none() {
                req.session_id = state.session_id.clone();
            }
            self.append(&mut state, CanonicalEvent::RunStart);
            state.run_seq
        };

        let result = self.drive(&token, &req).await;

        let mut state = self.state.lock();
        if state.run_seq == seq {
            state.running = false;
            if let Err(e) = &result {
                state.error = Some(e.to_string());
            }
        }
        result
    }

    async fn drive(&self, token: &CancellationToken, req: &RunRequest) -> Result<RunOutcome> {
        let send = self
            .http
            .post(&self.endpoint)
            .header(ACCEPT, "text/event-stream")
            .json(req)
            .send();

        let mut resp = tokio::select! {
            _ = token.cancelled() => return Ok(RunOutcome::Cancelled),
            resp = send => resp.map_err(transport)?,
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Transport(format!("HTTP {}: {body}", status.as_u16())));
        }

        let mut decoder = FrameDecoder::new();
        loop {
            let chunk = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(RunOutcome::Cancelled),
                chunk = resp.chunk() => chunk,
            };
            match chunk {
                Ok(Some(bytes)) => {
                    for payload in decoder.push_bytes(&bytes) {
                        self.accept(token, &payload);
                    }
                }
                Ok(None) => break,
                Err(_) if token.is_cancelled() => return Ok(RunOutcome::Cancelled),
                Err(e) => return Err(transport(e)),
            }
        }

        if decoder.has_partial() {
            tracing::warn!("stream ended with an incomplete frame, dropped");
        }
        if token.is_cancelled() {
            return Ok(RunOutcome::Cancelled);
        }
        Ok(RunOutcome::Completed)
    }

    /// Decode one frame payload and append it unless the run was cancelled.
    fn accept(&self, token: &CancellationToken, payload: &str) {
        let event = match decode_payload(payload) {
            Ok(ev) => ev,
            Err(e) => {
                tracing::warn!(error = %e, payload, "dropping unparsable frame");
                return;
            }
        };
        if !event.is_wire_event() {
            tracing::warn!(kind = event.kind(), "dropping local-only event received from server");
            return;
        }

        let mut state = self.state.lock();
        // Checked under the lock so no frame lands after a newer run's marker.
        if token.is_cancelled() {
            tracing::debug!(kind = event.kind(), "discarding frame from cancelled run");
            return;
        }
        match &event {
            CanonicalEvent::Meta { session_id } => state.session_id = Some(session_id.clone()),
            CanonicalEvent::Error { message } => state.error = Some(message.clone()),
            _ => {}
        }
        self.append(&mut state, event);
    }

    fn append(&self, state: &mut ClientState, event: CanonicalEvent) {
        let logged = LoggedEvent {
            event,
            received_at: Utc::now(),
        };
        state.log.push(logged.clone());
        // No subscribers is fine.
        let _ = self.events_tx.send(logged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn run_request_omits_absent_fields() {
        let body = serde_json::to_value(RunRequest::new("hi")).unwrap();
        assert_eq!(body, json!({"prompt": "hi"}));

        let body = serde_json::to_value(RunRequest {
            session_id: Some("s".into()),
            model_id: Some("p/m".into()),
            ..RunRequest::new("hi")
        })
        .unwrap();
        assert_eq!(body, json!({"prompt": "hi", "sessionId": "s", "modelId": "p/m"}));
    }

    #[test]
    fn endpoint_is_normalized() {
        let client = StreamClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.endpoint, "http://localhost:8080/invocations");
    }

    #[test]
    fn cancel_without_run_is_harmless() {
        let client = StreamClient::new("http://localhost:1").unwrap();
        client.cancel();
        assert!(!client.is_running());
        assert!(client.error().is_none());
    }
}
