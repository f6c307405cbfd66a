pub mod error;
pub mod io;
pub mod llm;
pub mod models;
pub mod session;
pub mod stages;

pub use error::{EncodingError, GenerationError, ParseError, ServiceError};
pub use io::{aggregate_spend_csv, encode_file, parse_spend_csv, parse_spend_file};
pub use llm::{
    GeminiClient, GeminiConfig, GenerationRequest, ImageGenerationService, TextGenerationService,
};
pub use models::{
    EvidenceDocument, EvidenceSet, ImagePatch, ItemKind, ProposalDraft, Recommendation,
    SpendRecord, SponsorshipReview,
};
pub use session::{AttemptId, Phase, ProposalSession, SelectionOutcome, SessionSnapshot};
pub use stages::{IllustrationConfig, execute_draft, execute_illustration};
