use std::env;

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` 控制过滤（默认 info），`LOG_FORMAT=json` 输出结构化日志
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(e) = result {
        tracing::warn!("Logging already initialized: {}", e);
    }
}
