//! 调用方侧的三级降级：网关 -> 客户端密钥直连供应商 -> 固定致歉文案。
//! `generate_response` 从不返回错误，失败只体现在 `FallbackReply::tier` 上。

pub mod mentor;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::config::settings::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use crate::error::GatewayError;
use crate::http_client::client_for_url_with_timeout;
use crate::providers::{GeminiProvider, GenerativeProvider};
use crate::server::util::mask_key;

pub use mentor::{Mood, analyze_sentiment, mentor_prompt};

pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:4000";
/// 网关失败且没有客户端密钥
pub const UNAVAILABLE_MESSAGE: &str = "Desculpe, não foi possível contactar a IA neste momento.";
/// 直连供应商也失败
pub const PROCESSING_FAILED_MESSAGE: &str =
    "Desculpe, não consegui processar o seu pedido neste momento.";

#[derive(Clone)]
pub struct ClientConfig {
    pub gateway_url: String,
    pub gateway_token: Option<String>,
    pub client_api_key: Option<String>,
    pub provider_base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            gateway_token: None,
            client_api_key: None,
            provider_base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("gateway_url", &self.gateway_url)
            .field("gateway_token", &self.gateway_token.as_deref().map(mask_key))
            .field("client_api_key", &self.client_api_key.as_deref().map(mask_key))
            .field("provider_base_url", &self.provider_base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Gateway,
    Direct,
    Static,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackReply {
    pub tier: Tier,
    pub text: String,
}

impl FallbackReply {
    fn fixed(message: &str) -> Self {
        Self {
            tier: Tier::Static,
            text: message.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct GatewayRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct GatewayReply {
    #[serde(default)]
    text: Option<String>,
}

pub struct FallbackClient {
    config: ClientConfig,
    http: reqwest::Client,
    direct: Option<Arc<dyn GenerativeProvider>>,
}

impl FallbackClient {
    pub fn new(config: ClientConfig) -> Result<Self, GatewayError> {
        let direct: Option<Arc<dyn GenerativeProvider>> = match config
            .client_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
        {
            Some(key) => {
                let provider = GeminiProvider::new(ProviderConfig {
                    api_key: Some(key.to_string()),
                    base_url: config.provider_base_url.clone(),
                    default_model: config.model.clone(),
                    timeout_secs: config.timeout_secs,
                    ..ProviderConfig::default()
                })?;
                Some(Arc::new(provider))
            }
            None => None,
        };
        Self::with_direct_provider(config, direct)
    }

    pub fn with_direct_provider(
        config: ClientConfig,
        direct: Option<Arc<dyn GenerativeProvider>>,
    ) -> Result<Self, GatewayError> {
        let http = client_for_url_with_timeout(
            &config.gateway_url,
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self {
            config,
            http,
            direct,
        })
    }

    /// 包裹导师提示后走完整降级链
    pub async fn generate_response(&self, user_input: &str) -> FallbackReply {
        self.generate_raw(&mentor_prompt(user_input)).await
    }

    pub async fn generate_raw(&self, prompt: &str) -> FallbackReply {
        match self.call_gateway(prompt).await {
            Ok(text) => {
                return FallbackReply {
                    tier: Tier::Gateway,
                    text,
                };
            }
            Err(e) => {
                tracing::warn!("Gateway call failed, falling back to direct provider: {}", e);
            }
        }

        let Some(direct) = self.direct.as_ref().filter(|p| p.is_configured()) else {
            tracing::error!("No Gemini configuration available (gateway failed and no client-side key)");
            return FallbackReply::fixed(UNAVAILABLE_MESSAGE);
        };

        match direct.generate_content(prompt, &self.config.model).await {
            Ok(text) => FallbackReply {
                tier: Tier::Direct,
                text,
            },
            Err(e) => {
                tracing::error!("Direct provider call failed: {}", e);
                FallbackReply::fixed(PROCESSING_FAILED_MESSAGE)
            }
        }
    }

    /// 任何非 2xx、网络错误、超时或空文本都视为网关不可用
    async fn call_gateway(&self, prompt: &str) -> Result<String, GatewayError> {
        let url = format!("{}/api/gemini", self.config.gateway_url.trim_end_matches('/'));
        let mut builder = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .json(&GatewayRequest { prompt });
        if let Some(token) = &self.config.gateway_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Upstream(format!("gateway responded {}", status)));
        }

        let reply: GatewayReply = response.json().await?;
        reply
            .text
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GatewayError::Upstream("gateway returned empty text".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::server::create_app_with_provider;
    use crate::test_support::{SpyProvider, spawn_fake_gemini, spawn_router};
    use axum::http::StatusCode;
    use serde_json::json;

    // 端口 9 上没有监听，连接会被立即拒绝
    const DEAD_GATEWAY: &str = "http://127.0.0.1:9";

    async fn spawn_gateway(provider: Arc<SpyProvider>) -> String {
        spawn_router(create_app_with_provider(Settings::default(), provider)).await
    }

    fn config_for(gateway_url: &str) -> ClientConfig {
        ClientConfig {
            gateway_url: gateway_url.to_string(),
            timeout_secs: 5,
            ..ClientConfig::default()
        }
    }

    #[tokio::test]
    async fn gateway_tier_answers_with_mentor_prompt() {
        let upstream = Arc::new(SpyProvider::replying("O que te motiva?"));
        let url = spawn_gateway(upstream.clone()).await;
        let client = FallbackClient::new(config_for(&url)).unwrap();

        let reply = client.generate_response("Quero mudar de carreira").await;
        assert_eq!(reply.tier, Tier::Gateway);
        assert_eq!(reply.text, "O que te motiva?");

        let calls = upstream.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains("Usuário: Quero mudar de carreira"));
    }

    #[tokio::test]
    async fn gateway_error_falls_back_to_direct_provider() {
        let url = spawn_gateway(Arc::new(SpyProvider::failing("boom"))).await;
        let direct = Arc::new(SpyProvider::replying("direct answer"));
        let client =
            FallbackClient::with_direct_provider(config_for(&url), Some(direct.clone() as Arc<dyn GenerativeProvider>))
                .unwrap();

        let reply = client.generate_raw("oi").await;
        assert_eq!(reply.tier, Tier::Direct);
        assert_eq!(reply.text, "direct answer");
        assert_eq!(direct.calls(), vec![("oi".to_string(), DEFAULT_MODEL.to_string())]);
    }

    #[tokio::test]
    async fn empty_gateway_text_falls_back() {
        let url = spawn_gateway(Arc::new(SpyProvider::replying(""))).await;
        let direct = Arc::new(SpyProvider::replying("direct"));
        let client =
            FallbackClient::with_direct_provider(config_for(&url), Some(direct.clone() as Arc<dyn GenerativeProvider>))
                .unwrap();

        let reply = client.generate_raw("oi").await;
        assert_eq!(reply.tier, Tier::Direct);
    }

    #[tokio::test]
    async fn unreachable_gateway_without_key_returns_static_message() {
        let client = FallbackClient::new(config_for(DEAD_GATEWAY)).unwrap();
        let reply = client.generate_response("oi").await;
        assert_eq!(reply, FallbackReply::fixed(UNAVAILABLE_MESSAGE));
    }

    #[tokio::test]
    async fn failing_direct_provider_returns_processing_message() {
        let direct = Arc::new(SpyProvider::failing("quota"));
        let client =
            FallbackClient::with_direct_provider(config_for(DEAD_GATEWAY), Some(direct as Arc<dyn GenerativeProvider>))
                .unwrap();
        let reply = client.generate_raw("oi").await;
        assert_eq!(reply, FallbackReply::fixed(PROCESSING_FAILED_MESSAGE));
    }

    #[tokio::test]
    async fn direct_tier_uses_client_key_against_gemini() {
        let upstream = spawn_fake_gemini(
            StatusCode::OK,
            json!({"candidates": [{"content": {"parts": [{"text": "42"}]}}]}),
        )
        .await;
        let client = FallbackClient::new(ClientConfig {
            client_api_key: Some("client-key".into()),
            provider_base_url: upstream.base_url.clone(),
            ..config_for(DEAD_GATEWAY)
        })
        .unwrap();

        let reply = client.generate_raw("meaning of life").await;
        assert_eq!(reply.tier, Tier::Direct);
        assert_eq!(reply.text, "42");
        assert_eq!(upstream.calls()[0].api_key.as_deref(), Some("client-key"));
    }

    #[tokio::test]
    async fn blocked_direct_reply_becomes_processing_message() {
        let upstream = spawn_fake_gemini(
            StatusCode::OK,
            json!({"promptFeedback": {"blockReason": "SAFETY"}}),
        )
        .await;
        let client = FallbackClient::new(ClientConfig {
            client_api_key: Some("client-key".into()),
            provider_base_url: upstream.base_url.clone(),
            ..config_for(DEAD_GATEWAY)
        })
        .unwrap();

        let reply = client.generate_raw("oi").await;
        assert_eq!(reply, FallbackReply::fixed(PROCESSING_FAILED_MESSAGE));
        assert_eq!(upstream.calls().len(), 1);
    }
}
