//! REST memory client against a scripted local server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use sb_domain::config::MemoryConfig;
use sb_domain::error::Error;
use sb_memory::{MemoryProvider, MemoryRole, RestMemoryClient};
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct Script {
    hits: Arc<AtomicUsize>,
    /// Number of leading requests answered with this status.
    fail_first: usize,
    fail_status: u16,
    last_body: Arc<parking_lot::Mutex<Option<Value>>>,
}

async fn handle(State(s): State<Script>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let n = s.hits.fetch_add(1, Ordering::SeqCst);
    *s.last_body.lock() = Some(body);
    if n < s.fail_first {
        let status = StatusCode::from_u16(s.fail_status).unwrap();
        return (status, Json(json!({"error": "scripted"})));
    }
    (
        StatusCode::OK,
        Json(json!({"memories": [{"text": "likes rust", "score": 0.9}, {"text": "uses tokio"}]})),
    )
}

async fn serve(script: Script) -> String {
    let app = Router::new()
        .route("/api/memories", post(handle))
        .route("/api/memories/recall", post(handle))
        .with_state(script);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn config(max_retries: u32) -> MemoryConfig {
    MemoryConfig {
        max_retries,
        timeout_ms: 2_000,
        ..Default::default()
    }
}

#[tokio::test]
async fn append_posts_camel_case_body() {
    let script = Script::default();
    let url = serve(script.clone()).await;
    let client = RestMemoryClient::new(&url, &config(0)).unwrap();

    client.append("u1", "s1", MemoryRole::User, "hello").await.unwrap();

    let body = script.last_body.lock().clone().unwrap();
    assert_eq!(body["actorId"], "u1");
    assert_eq!(body["sessionId"], "s1");
    assert_eq!(body["role"], "user");
    assert_eq!(body["text"], "hello");
}

#[tokio::test]
async fn recall_returns_texts() {
    let script = Script::default();
    let url = serve(script.clone()).await;
    let client = RestMemoryClient::new(&url, &config(0)).unwrap();

    let got = client.recall("u1", "rust", 3).await.unwrap();
    assert_eq!(got, vec!["likes rust".to_string(), "uses tokio".to_string()]);
    let body = script.last_body.lock().clone().unwrap();
    assert_eq!(body["topK"], 3);
}

#[tokio::test]
async fn server_errors_are_retried() {
    let script = Script {
        fail_first: 2,
        fail_status: 503,
        ..Default::default()
    };
    let url = serve(script.clone()).await;
    let client = RestMemoryClient::new(&url, &config(3)).unwrap();

    client.append("u1", "s1", MemoryRole::Assistant, "hi").await.unwrap();
    assert_eq!(script.hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retries_are_bounded() {
    let script = Script {
        fail_first: usize::MAX,
        fail_status: 500,
        ..Default::default()
    };
    let url = serve(script.clone()).await;
    let client = RestMemoryClient::new(&url, &config(1)).unwrap();

    let err = client.recall("u1", "q", 3).await.unwrap_err();
    assert!(matches!(err, Error::Memory(_)));
    assert_eq!(script.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let script = Script {
        fail_first: usize::MAX,
        fail_status: 400,
        ..Default::default()
    };
    let url = serve(script.clone()).await;
    let client = RestMemoryClient::new(&url, &config(3)).unwrap();

    let err = client.append("u1", "s1", MemoryRole::User, "x").await.unwrap_err();
    assert!(matches!(err, Error::Memory(_)));
    assert_eq!(script.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unauthorized_maps_to_auth_error() {
    let script = Script {
        fail_first: usize::MAX,
        fail_status: 401,
        ..Default::default()
    };
    let url = serve(script.clone()).await;
    let client = RestMemoryClient::new(&url, &config(3)).unwrap();

    let err = client.recall("u1", "q", 1).await.unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
}
