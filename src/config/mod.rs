pub mod settings;

pub use settings::{ProviderConfig, SecurityConfig, ServerConfig, Settings};
