pub mod gemini;

use std::future::Future;
use std::pin::Pin;

use crate::error::GatewayError;

pub use gemini::GeminiProvider;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// 生成式模型供应商抽象（网关与回退客户端共用，测试中可替换为 mock）
pub trait GenerativeProvider: Send + Sync {
    fn name(&self) -> &str;

    /// 是否持有可用凭证；未配置时每次调用都会确定性失败
    fn is_configured(&self) -> bool;

    fn generate_content<'a>(
        &'a self,
        prompt: &'a str,
        model: &'a str,
    ) -> BoxFuture<'a, Result<String, GatewayError>>;
}
