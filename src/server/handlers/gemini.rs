use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::auth::ensure_access;
use crate::error::GatewayError;
use crate::server::AppState;
use crate::server::generation::generate;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PromptPayload {
    pub prompt: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub text: String,
}

impl PromptPayload {
    /// 宽松解析：非 JSON、非对象或字段类型不符都视为缺失，交由校验返回 400
    pub fn from_body(body: &[u8]) -> Self {
        let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) else {
            return Self::default();
        };
        let field = |name: &str| map.get(name).and_then(Value::as_str).map(str::to_string);
        Self {
            prompt: field("prompt"),
            model: field("model"),
        }
    }
}

pub async fn generate_text(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<GenerateResponse>, GatewayError> {
    ensure_access(&headers, &app_state)?;

    let payload = PromptPayload::from_body(&body);
    let text = generate(&app_state, payload.prompt.as_deref(), payload.model.as_deref()).await?;
    Ok(Json(GenerateResponse { text }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_reads_prompt_and_model() {
        let p = PromptPayload::from_body(br#"{"prompt":"oi","model":"gemini-x"}"#);
        assert_eq!(p.prompt.as_deref(), Some("oi"));
        assert_eq!(p.model.as_deref(), Some("gemini-x"));
    }

    #[test]
    fn payload_tolerates_garbage() {
        assert_eq!(PromptPayload::from_body(b""), PromptPayload::default());
        assert_eq!(PromptPayload::from_body(b"not json"), PromptPayload::default());
        assert_eq!(PromptPayload::from_body(b"[1,2]"), PromptPayload::default());
        let p = PromptPayload::from_body(br#"{"prompt": 42}"#);
        assert_eq!(p.prompt, None);
    }
}
