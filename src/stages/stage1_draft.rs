use tracing::{info, warn};

use crate::error::GenerationError;
use crate::llm::{TextGenerationService, build_proposal_request, validate_draft_response};
use crate::models::{EvidenceDocument, ProposalDraft, SpendRecord};

/// Execute Stage 1: proposal drafting
///
/// 1. Build one request from the spend record, the full evidence set and the
///    output schema
/// 2. Call the text model once (no retry, no timeout)
/// 3. Validate the body into a draft with no images
pub async fn execute_draft<T>(
    service: &T,
    record: &SpendRecord,
    evidence: &[EvidenceDocument],
) -> Result<ProposalDraft, GenerationError>
where
    T: TextGenerationService + ?Sized,
{
    let request = build_proposal_request(record, evidence);

    info!(
        "Stage 1: Drafting proposal for {} ({} products, {} evidence documents)",
        record.business_name(),
        record.product_count(),
        evidence.len()
    );

    let body = service
        .generate(&request)
        .await
        .inspect_err(|e| warn!("Drafting request for {} failed: {}", record.business_name(), e))?;

    let draft = validate_draft_response(&body)
        .inspect_err(|e| warn!("Draft for {} rejected: {}", record.business_name(), e))?;

    info!(
        "Stage 1: Draft accepted with {} reviews, {} recommendations",
        draft.sponsorship_reviews.len(),
        draft.recommendations.len()
    );

    Ok(draft)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::ServiceError;
    use crate::llm::GenerationRequest;

    /// Replays a canned body and remembers the last request
    struct CannedText {
        body: Result<String, u16>,
        seen: Mutex<Option<GenerationRequest>>,
    }

    impl CannedText {
        fn ok(body: &str) -> Self {
            Self {
                body: Ok(body.to_string()),
                seen: Mutex::new(None),
            }
        }

        fn status(status: u16) -> Self {
            Self {
                body: Err(status),
                seen: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl TextGenerationService for CannedText {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, ServiceError> {
            *self.seen.lock().unwrap() = Some(request.clone());
            match &self.body {
                Ok(body) => Ok(body.clone()),
                Err(status) => Err(ServiceError::Status {
                    status: *status,
                    message: "unavailable".to_string(),
                }),
            }
        }
    }

    fn acme() -> SpendRecord {
        SpendRecord::from_products("Acme", [("Widget", 1000.0), ("Gadget", 500.0)])
    }

    #[tokio::test]
    async fn test_draft_is_validated_and_request_carries_evidence() {
        let service = CannedText::ok(
            r#"{"summary":"s","analysis":"a","sponsorshipReviews":[{"name":"Widget","amount":1000,"narrative":"n"}],"recommendations":[]}"#,
        );
        let evidence = vec![EvidenceDocument::from_bytes("p.pdf", b"x", "application/pdf")];

        let draft = execute_draft(&service, &acme(), &evidence).await.unwrap();

        assert_eq!(draft.sponsorship_reviews[0].name, "Widget");
        let seen = service.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.attachments.len(), 1);
        assert!(seen.prompt.contains("Acme"));
    }

    #[tokio::test]
    async fn test_service_failure_is_generation_error() {
        let service = CannedText::status(503);
        let err = execute_draft(&service, &acme(), &[]).await.unwrap_err();
        assert!(matches!(err, GenerationError::Service(_)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_generation_error() {
        let service = CannedText::ok("not json");
        let err = execute_draft(&service, &acme(), &[]).await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidJson(_)));
    }
}
