pub mod generation;
pub mod handlers;
pub(crate) mod request_logging;
pub mod util;

use crate::config::Settings;
use crate::error::Result as AppResult;
use crate::providers::{GeminiProvider, GenerativeProvider};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Settings,
    pub provider: Arc<dyn GenerativeProvider>,
}

pub async fn create_app(config: Settings) -> AppResult<Router> {
    let provider = GeminiProvider::new(config.provider.clone())?;
    Ok(create_app_with_provider(config, Arc::new(provider)))
}

/// 以注入的 provider 构建路由（测试与自定义供应商使用）
pub fn create_app_with_provider(config: Settings, provider: Arc<dyn GenerativeProvider>) -> Router {
    // 缺少凭证只在启动时提示一次；服务照常启动以便健康检查
    if !provider.is_configured() {
        tracing::warn!(
            "GEMINI_API_KEY / VITE_GEMINI_API_KEY not found; every /api/gemini request will fail until a key is configured"
        );
    }
    if config.security.access_token.is_some() {
        tracing::info!("Bearer token required on /api/gemini");
    }
    tracing::info!("Default model: {}", config.provider.default_model);

    let body_limit = config.server.max_body_bytes;
    let app_state = AppState { config, provider };

    let app = handlers::routes()
        .with_state(Arc::new(app_state))
        .layer(DefaultBodyLimit::max(body_limit));

    // CORS：浏览器端直接调用，来源不做限制
    use axum::http::{Method, header};
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_origin(Any);

    app.layer(cors).layer(TraceLayer::new_for_http())
}
