mod http;
mod memory;

use async_trait::async_trait;

use crate::types::{CheckResponse, Identity, SubmitRequest, SubmitResponse};

pub use http::HttpBackend;
pub use memory::InMemoryBackend;

/// Result type for answer service calls
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors that can occur while talking to the answer service
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Answer service returned status {0}")]
    Status(u16),

    #[error("Response parsing failed: {0}")]
    Parse(String),
}

/// The external service that persists and grades answers
#[async_trait]
pub trait QuizBackend: Send + Sync {
    /// Look up whether this identity has already answered
    async fn check(&self, identity: &Identity) -> BackendResult<CheckResponse>;

    /// Record an answer and grade it
    async fn submit(&self, request: &SubmitRequest) -> BackendResult<SubmitResponse>;

    /// Get the name of this backend
    fn name(&self) -> &str;
}
