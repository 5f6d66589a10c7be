//! `POST /invocations`: run the orchestrator for one prompt.
//!
//! With `Accept: text/event-stream` the response is a live frame stream:
//! a `meta` frame, every canonical event as it is produced, then one
//! terminal `message.done`. Otherwise the run is awaited and returned as
//! `{result}` or `500 {error}`.

use std::convert::Infallible;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::Instrument;

use futures_util::StreamExt;
use sb_domain::event::CanonicalEvent;
use sb_domain::trace::TraceEvent;

use crate::runtime::RunContext;
use crate::state::AppState;

/// Bounded queue between the run and the HTTP writer.
const FRAME_QUEUE: usize = 64;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request shape
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
}

fn bad_request(msg: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": msg.into() }))).into_response()
}

fn wants_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains("text/event-stream"))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /invocations
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn invoke(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<InvocationRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return bad_request(format!("invalid request body: {}", e.body_text())),
    };
    let prompt = match body.prompt {
        Some(p) if !p.trim().is_empty() => p,
        _ => return bad_request("prompt is required"),
    };

    let streaming = wants_stream(&headers);
    let ctx = RunContext {
        session_id: body.session_id,
        user_id: body.user_id,
        model_id: body.model_id,
    };
    let model_id = state.orchestrator.effective_model(&ctx);

    if streaming {
        stream_invocation(state, prompt, ctx, model_id).into_response()
    } else {
        TraceEvent::InvocationReceived {
            session_id: ctx.session_id.clone().unwrap_or_default(),
            model_id: model_id.clone(),
            streaming: false,
            prompt_chars: prompt.chars().count(),
        }
        .emit();

        let span = tracing::info_span!(
            "invocation",
            session_id = ctx.session_id.as_deref().unwrap_or(""),
            model_id = %model_id,
        );
        let result = state.orchestrator.invoke(prompt, ctx).instrument(span).await;
        state.health.touch();
        match result {
            Ok(text) => Json(json!({ "result": text })).into_response(),
            Err(e) => {
                tracing::warn!(error = %e, "invocation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": e.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

fn stream_invocation(
    state: AppState,
    prompt: String,
    mut ctx: RunContext,
    model_id: String,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let session_id = ctx
        .session_id
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    ctx.session_id = Some(session_id.clone());

    TraceEvent::InvocationReceived {
        session_id: session_id.clone(),
        model_id: model_id.clone(),
        streaming: true,
        prompt_chars: prompt.chars().count(),
    }
    .emit();

    let (tx, mut rx) = mpsc::channel::<CanonicalEvent>(FRAME_QUEUE);

    let span = tracing::info_span!("invocation", session_id = %session_id, model_id = %model_id);
    let producer_tx = tx.clone();
    let producer = tokio::spawn(
        async move {
            let tx = producer_tx;
            if tx.send(CanonicalEvent::Meta { session_id }).await.is_err() {
                return;
            }
            let mut events = state.orchestrator.stream(prompt, ctx);
            while let Some(event) = events.next().await {
                if tx.send(event).await.is_err() {
                    tracing::debug!("client disconnected, abandoning run");
                    return;
                }
            }
            let _ = tx.send(CanonicalEvent::MessageDone).await;
            state.health.touch();
        }
        .instrument(span),
    );

    // Anything escaping the producer becomes one error frame.
    tokio::spawn(async move {
        if let Err(e) = producer.await {
            tracing::error!(error = %e, "invocation task failed");
            let _ = tx
                .send(CanonicalEvent::Error {
                    message: format!("internal error: {e}"),
                })
                .await;
        }
    });

    let frames = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(data) => {
                    yield Ok(Event::default().data(data));
                }
                Err(e) => {
                    tracing::error!(error = %e, kind = event.kind(), "failed to encode event");
                    let fallback = json!({ "type": "error", "message": format!("encoding failed: {e}") });
                    yield Ok(Event::default().data(fallback.to_string()));
                }
            }
        }
    };

    Sse::new(frames).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn accept_header_selects_streaming() {
        let mut headers = HeaderMap::new();
        assert!(!wants_stream(&headers));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        assert!(!wants_stream(&headers));
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream, application/json;q=0.5"),
        );
        assert!(wants_stream(&headers));
    }

    #[test]
    fn request_fields_are_camel_case() {
        let req: InvocationRequest = serde_json::from_value(json!({
            "prompt": "hi",
            "sessionId": "s",
            "userId": "u",
            "modelId": "p/m"
        }))
        .unwrap();
        assert_eq!(req.session_id.as_deref(), Some("s"));
        assert_eq!(req.user_id.as_deref(), Some("u"));
        assert_eq!(req.model_id.as_deref(), Some("p/m"));
    }
}
