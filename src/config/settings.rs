use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::GatewayError;
use crate::server::util::mask_key;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-09-2025";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_API_VERSION: &str = "v1beta";
pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

/// 密钥的环境变量来源，按优先级排列
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "VITE_GEMINI_API_KEY"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub api_version: String,
    pub default_model: String,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// 密钥只以掩码形式出现在日志中
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_deref().map(mask_key))
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("default_model", &self.default_model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ProviderConfig {
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// 设置后 `/api/gemini` 需要 `Authorization: Bearer <token>`
    pub access_token: Option<String>,
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("access_token", &self.access_token.as_deref().map(mask_key))
            .finish()
    }
}

impl Settings {
    /// 加载顺序：`.env` -> 可选的配置文件 -> 环境变量覆盖
    pub fn load() -> Result<Self, GatewayError> {
        // .env 不存在是正常情况
        let _ = dotenvy::dotenv();

        let mut settings = match Self::find_config_file_in(Path::new(".")) {
            Some(path) => {
                tracing::info!("Loading configuration from {}", path.display());
                Self::from_file(&path)?
            }
            None => Settings::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GatewayError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| GatewayError::Config(format!("invalid {}: {}", path.display(), e)))
    }

    /// 用环境变量覆盖文件中的值；空字符串视为未设置
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = API_KEY_ENV_VARS.iter().find_map(|name| get(*name)) {
            self.provider.api_key = Some(key);
        }
        if let Some(port) = get("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| GatewayError::Config(format!("PORT is not a valid port: {}", port)))?;
        }
        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(model) = get("GEMINI_MODEL") {
            self.provider.default_model = model;
        }
        if let Some(base_url) = get("GEMINI_BASE_URL") {
            self.provider.base_url = base_url;
        }
        if let Some(secs) = get("GEMINI_TIMEOUT_SECS") {
            self.provider.timeout_secs = secs.trim().parse().map_err(|_| {
                GatewayError::Config(format!("GEMINI_TIMEOUT_SECS is not a number: {}", secs))
            })?;
        }
        if let Some(token) = get("GATEWAY_ACCESS_TOKEN") {
            self.security.access_token = Some(token);
        }
        if let Some(limit) = get("GATEWAY_MAX_BODY_BYTES") {
            self.server.max_body_bytes = limit.trim().parse().map_err(|_| {
                GatewayError::Config(format!("GATEWAY_MAX_BODY_BYTES is not a number: {}", limit))
            })?;
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// `custom-config.toml` 优先于 `config.toml`
    fn find_config_file_in(dir: &Path) -> Option<PathBuf> {
        let possible_names = ["custom-config.toml", "config.toml"];

        possible_names
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }
}
