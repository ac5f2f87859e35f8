pub mod http;
pub mod types;

use async_trait::async_trait;

use crate::error::BackendError;

pub use http::HttpBackend;
pub use types::{AnswerEnvelope, HealthStatus, QueryRequest};

/// The remote question-answering service.
#[async_trait]
pub trait AnswerBackend: Send + Sync {
    /// Sends one question and returns the decoded answer.
    async fn ask(&self, request: &QueryRequest) -> Result<AnswerEnvelope, BackendError>;

    async fn health(&self) -> Result<HealthStatus, BackendError>;
}
