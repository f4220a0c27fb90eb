pub mod client;
pub mod types;

pub use client::{GeminiProvider, extract_text};
