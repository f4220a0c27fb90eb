use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// 上游失败且没有可用消息时返回给调用方的通用文本
pub const GENERIC_UPSTREAM_MESSAGE: &str = "Internal error";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Upstream(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 对外暴露的错误消息；内部错误不回显细节
    pub fn public_message(&self) -> String {
        match self {
            GatewayError::InvalidRequest(msg) => msg.clone(),
            GatewayError::Unauthorized => "Unauthorized".to_string(),
            GatewayError::Upstream(msg) if !msg.trim().is_empty() => msg.clone(),
            _ => GENERIC_UPSTREAM_MESSAGE.to_string(),
        }
    }

    /// 把任意供应商侧错误折叠为 `Upstream`，请求校验错误保持原样
    pub fn into_upstream(self) -> GatewayError {
        match self {
            GatewayError::InvalidRequest(_) | GatewayError::Upstream(_) => self,
            GatewayError::Http(e) => GatewayError::Upstream(e.to_string()),
            GatewayError::Json(e) => {
                GatewayError::Upstream(format!("Gemini returned a non-JSON body: {}", e))
            }
            GatewayError::Io(e) => GatewayError::Upstream(e.to_string()),
            GatewayError::Config(msg) => GatewayError::Upstream(msg),
            GatewayError::Unauthorized => GatewayError::Upstream("Unauthorized".into()),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}
