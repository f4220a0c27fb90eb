use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::server::util::truncate_for_log;

// 单次生成的结构化日志；不记录 prompt 全文与凭证
pub fn log_generation(
    request_id: &Uuid,
    start_time: DateTime<Utc>,
    provider: &str,
    model: &str,
    prompt: &str,
    result: &Result<String, GatewayError>,
) {
    let latency_ms = (Utc::now() - start_time).num_milliseconds();
    let prompt_chars = prompt.chars().count();

    match result {
        Ok(text) => tracing::info!(
            %request_id,
            provider,
            model,
            prompt_chars,
            response_chars = text.chars().count(),
            latency_ms,
            "generation succeeded"
        ),
        Err(e) => tracing::error!(
            %request_id,
            provider,
            model,
            prompt_chars,
            latency_ms,
            error = %truncate_for_log(&e.to_string(), 300),
            "generation failed"
        ),
    }
}
