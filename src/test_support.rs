use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::Json;
use serde_json::Value;

use crate::error::GatewayError;
use crate::providers::{BoxFuture, GenerativeProvider};

pub async fn spawn_router(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub path: String,
    pub api_key: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct FakeState {
    status: StatusCode,
    reply: Value,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

pub struct FakeUpstream {
    pub base_url: String,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl FakeUpstream {
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

async fn fake_handler(
    State(state): State<FakeState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let api_key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
    state.calls.lock().unwrap().push(RecordedCall {
        path: uri.path().to_string(),
        api_key,
        body,
    });
    (state.status, Json(state.reply.clone()))
}

/// 任意路径都返回固定状态码与 JSON，并记录收到的请求
pub async fn spawn_fake_gemini(status: StatusCode, reply: Value) -> FakeUpstream {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let state = FakeState {
        status,
        reply,
        calls: calls.clone(),
    };
    let router = Router::new().fallback(fake_handler).with_state(state);
    let base_url = spawn_router(router).await;
    FakeUpstream { base_url, calls }
}

/// 每个请求都先睡眠 `delay` 再返回正常候选，用于触发客户端超时
pub async fn spawn_slow_gemini(delay: Duration) -> String {
    let router = Router::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        Json(serde_json::json!({"candidates": [{"content": {"parts": [{"text": "late"}]}}]}))
    });
    spawn_router(router).await
}

/// 记录调用并返回预设结果的 provider
pub struct SpyProvider {
    reply: Result<String, String>,
    configured: bool,
    calls: Mutex<Vec<(String, String)>>,
}

impl SpyProvider {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            configured: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            configured: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl GenerativeProvider for SpyProvider {
    fn name(&self) -> &str {
        "spy"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn generate_content<'a>(
        &'a self,
        prompt: &'a str,
        model: &'a str,
    ) -> BoxFuture<'a, Result<String, GatewayError>> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), model.to_string()));
            self.reply.clone().map_err(GatewayError::Upstream)
        })
    }
}
