pub mod http;
#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use crate::models::Token;

pub use self::http::HttpBackend;

/// The launch-listing backend: full snapshot retrieval plus moderation.
#[async_trait]
pub trait TokenBackend: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch_tokens(&self) -> Result<Vec<Token>, BackendError>;
    async fn mark_scam(&self, pair_address: &str) -> Result<(), BackendError>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Unexpected status: {0}")]
    Status(u16),
    #[error("Parse error: {0}")]
    Parse(String),
}
