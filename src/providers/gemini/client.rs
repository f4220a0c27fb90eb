use std::time::Duration;

use crate::config::ProviderConfig;
use crate::error::GatewayError;
use crate::http_client::client_for_url_with_timeout;
use crate::providers::{BoxFuture, GenerativeProvider};
use crate::server::util::truncate_for_log;

use super::types::{ErrorEnvelope, GenerateContentRequest, GenerateContentResponse};

pub const MISSING_KEY_MESSAGE: &str = "Gemini API key is not configured";
pub const INVALID_MODEL_MESSAGE: &str = "Invalid model";

pub struct GeminiProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, GatewayError> {
        let client = client_for_url_with_timeout(
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self { config, client })
    }

    /// 允许传入 `models/xxx` 形式的模型名；其余部分只能是普通模型 id，
    /// 不能借助 `:`、`?`、`/` 等改写请求的方法或路径
    pub fn endpoint_for(&self, model: &str) -> Result<String, GatewayError> {
        let model = model.trim().trim_start_matches("models/");
        if !is_valid_model_id(model) {
            return Err(GatewayError::InvalidRequest(INVALID_MODEL_MESSAGE.into()));
        }
        Ok(format!(
            "{}/{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.api_version.trim_matches('/'),
            model
        ))
    }

    pub async fn generate(&self, prompt: &str, model: &str) -> Result<String, GatewayError> {
        let Some(api_key) = self.config.api_key.as_deref().filter(|k| !k.trim().is_empty())
        else {
            return Err(GatewayError::Upstream(MISSING_KEY_MESSAGE.into()));
        };

        let url = self.endpoint_for(model)?;
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(&GenerateContentRequest::from_prompt(prompt))
            .send()
            .await
            .map_err(|e| self.classify_reqwest_error(e))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.classify_reqwest_error(e))?;

        if !status.is_success() {
            return Err(GatewayError::Upstream(upstream_error_message(status, &bytes)));
        }

        extract_text(&bytes)
    }

    fn classify_reqwest_error(&self, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            return GatewayError::Upstream(format!(
                "Gemini request timed out after {}s",
                self.config.timeout_secs
            ));
        }
        // 去掉 URL，避免把上游地址细节带给调用方
        GatewayError::Upstream(err.without_url().to_string())
    }
}

impl GenerativeProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn is_configured(&self) -> bool {
        self.config.has_api_key()
    }

    fn generate_content<'a>(
        &'a self,
        prompt: &'a str,
        model: &'a str,
    ) -> BoxFuture<'a, Result<String, GatewayError>> {
        Box::pin(async move { self.generate(prompt, model).await })
    }
}

fn is_valid_model_id(model: &str) -> bool {
    !model.is_empty()
        && model
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
}

/// 两步尽力提取：
/// 1. 按类型化响应读取首个候选的文本；被拦截的响应（promptFeedback 无候选，
///    或首个候选以 SAFETY/RECITATION/LANGUAGE 结束）视为上游错误；
/// 2. 结构无法识别、没有文本分片时，退回为整个原始 JSON 的序列化字符串。
/// 响应体不是 JSON 时返回 `Json` 错误，由调用链折叠为 `Upstream`。
pub fn extract_text(bytes: &[u8]) -> Result<String, GatewayError> {
    let raw: serde_json::Value = serde_json::from_slice(bytes)?;

    let typed = serde_json::from_value::<GenerateContentResponse>(raw.clone()).ok();
    if let Some(reason) = typed.as_ref().and_then(|r| r.block_message()) {
        return Err(GatewayError::Upstream(format!(
            "Text not available. {}",
            reason
        )));
    }

    match typed.and_then(|r| r.text()) {
        Some(text) => Ok(text),
        None => {
            let serialized = raw.to_string();
            tracing::warn!(
                "Gemini response carried no text parts; returning raw JSON: {}",
                truncate_for_log(&serialized, 200)
            );
            Ok(serialized)
        }
    }
}

fn upstream_error_message(status: reqwest::StatusCode, bytes: &[u8]) -> String {
    if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(bytes) {
        if let Some(message) = envelope.error.message.filter(|m| !m.trim().is_empty()) {
            return message;
        }
        if let Some(status_text) = envelope.error.status {
            return format!("{}: {}", status, status_text);
        }
    }

    let snippet = String::from_utf8_lossy(bytes);
    let snippet = snippet.trim();
    if snippet.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, truncate_for_log(snippet, 300))
    }
}
