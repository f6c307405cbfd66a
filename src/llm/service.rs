use async_trait::async_trait;

use crate::error::ServiceError;
use crate::models::EvidenceDocument;

/// One schema-constrained text generation call
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Role and tone framing for the model
    pub system_instruction: String,
    /// Structured data plus the task instructions
    pub prompt: String,
    /// Evidence sent inline alongside the prompt, in upload order
    pub attachments: Vec<EvidenceDocument>,
    /// Output schema the response body must follow
    pub response_schema: serde_json::Value,
}

/// Text model that answers with a JSON-encoded body
#[async_trait]
pub trait TextGenerationService: Send + Sync {
    /// Returns the raw response body; the caller parses and validates it.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ServiceError>;
}

/// Image model. Absence of a result is the only failure signal.
#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    /// Returns an image reference (URL or data URL), or `None` on any failure.
    async fn generate(&self, prompt: &str, aspect_ratio: &str) -> Option<String>;
}
