use axum::http::HeaderMap;

use crate::error::GatewayError;
use crate::server::AppState;
use crate::server::util::bearer_token;

// 未配置访问令牌时保持匿名访问
pub fn ensure_access(headers: &HeaderMap, app_state: &AppState) -> Result<(), GatewayError> {
    let Some(expected) = app_state.config.security.access_token.as_deref() else {
        return Ok(());
    };
    match bearer_token(headers) {
        Some(provided) if constant_time_eq(provided.as_bytes(), expected.as_bytes()) => Ok(()),
        _ => Err(GatewayError::Unauthorized),
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
