//! In-process stub of the Gemini endpoint for tests.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Json},
    Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub path: String,
    pub api_key: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct StubState {
    status: StatusCode,
    body: Value,
    delay: Duration,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

pub struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl StubServer {
    pub fn last_request(&self) -> Option<CapturedRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

/// Wrap `text` the way `generateContent` returns it.
pub fn candidate_body(text: &str) -> Value {
    json!({
        "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}],
        "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15}
    })
}

pub async fn spawn_stub(status: u16, body: Value) -> StubServer {
    spawn_stub_with_delay(status, body, Duration::ZERO).await
}

/// Serve `body` with `status` on every path, after `delay`.
pub async fn spawn_stub_with_delay(status: u16, body: Value, delay: Duration) -> StubServer {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = StubState {
        status: StatusCode::from_u16(status).unwrap(),
        body,
        delay,
        requests: requests.clone(),
    };

    let app = Router::new().fallback(handle).with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubServer {
        base_url: format!("http://{}", addr),
        requests,
    }
}

async fn handle(
    State(state): State<StubState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    state.requests.lock().unwrap().push(CapturedRequest {
        path: uri.path().to_string(),
        api_key: headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    (state.status, Json(state.body.clone()))
}
