//! The seam checkers and the suggestion engine call through.

use async_trait::async_trait;

use crate::client::LlmClient;
use crate::error::LlmError;
use crate::types::{LlmRequest, LlmResponse};

/// Anything that can turn a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Run one generation.
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Whether calls can be authorized.
    fn has_credential(&self) -> bool;
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        LlmClient::generate(self, request).await
    }

    fn has_credential(&self) -> bool {
        LlmClient::has_credential(self)
    }
}
