use chrono::Utc;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::server::AppState;
use crate::server::request_logging::log_generation;

pub const MISSING_PROMPT: &str = "Missing prompt";

/// 网关核心操作：校验 -> 默认模型替换 -> 调用供应商 -> 归一化错误。
///
/// 空或缺失的 prompt 直接返回 `InvalidRequest`，不会触达上游；
/// 供应商侧的任何失败都折叠为 `Upstream`，不做重试。
pub async fn generate(
    app_state: &AppState,
    prompt: Option<&str>,
    model: Option<&str>,
) -> Result<String, GatewayError> {
    let Some(prompt) = prompt.filter(|p| !p.trim().is_empty()) else {
        return Err(GatewayError::InvalidRequest(MISSING_PROMPT.into()));
    };

    let model = resolve_model(model, &app_state.config.provider.default_model);

    let request_id = Uuid::new_v4();
    let start_time = Utc::now();
    let result = app_state
        .provider
        .generate_content(prompt, model)
        .await
        .map_err(GatewayError::into_upstream);

    log_generation(
        &request_id,
        start_time,
        app_state.provider.name(),
        model,
        prompt,
        &result,
    );
    result
}

pub fn resolve_model<'a>(requested: Option<&'a str>, default_model: &'a str) -> &'a str {
    requested
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(default_model)
}
