use serde_json::Value;
use tracing::warn;

use crate::error::GenerationError;
use crate::llm::RECOMMENDATION_COUNT;
use crate::models::ProposalDraft;

/// Top-level fields every drafting response must carry, with their JSON type
const REQUIRED_FIELDS: &[(&str, FieldType)] = &[
    ("summary", FieldType::String),
    ("analysis", FieldType::String),
    ("sponsorshipReviews", FieldType::Array),
    ("recommendations", FieldType::Array),
];

#[derive(Debug, Clone, Copy)]
enum FieldType {
    String,
    Array,
}

impl FieldType {
    fn matches(self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Array => value.is_array(),
        }
    }
}

/// Parse and check a drafting response body.
///
/// The body must be a JSON object with the two text fields and the two arrays
/// (which may be empty), and every item must carry its required sub-fields.
/// Nothing is repaired: any deviation is a [`GenerationError`].
pub fn validate_draft_response(body: &str) -> Result<ProposalDraft, GenerationError> {
    let value: Value = serde_json::from_str(body).map_err(GenerationError::InvalidJson)?;

    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|(name, kind)| !value.get(name).is_some_and(|v| kind.matches(v)))
        .map(|(name, _)| name.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(GenerationError::MissingFields(missing));
    }

    let draft: ProposalDraft =
        serde_json::from_value(value).map_err(GenerationError::SchemaMismatch)?;

    if draft.recommendations.len() != RECOMMENDATION_COUNT {
        warn!(
            "Model returned {} recommendations, expected {}",
            draft.recommendations.len(),
            RECOMMENDATION_COUNT
        );
    }

    Ok(draft)
}
