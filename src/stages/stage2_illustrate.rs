use futures::future::join_all;
use tracing::{debug, info};

use crate::llm::ImageGenerationService;
use crate::models::{ImagePatch, ItemKind, ProposalDraft, Recommendation, SponsorshipReview};

/// Aspect ratio requested for every proposal illustration
pub const PROPOSAL_ASPECT_RATIO: &str = "16:9";

/// Configuration for Stage 2
#[derive(Debug, Clone)]
pub struct IllustrationConfig {
    /// When false, illustration is skipped and no image calls are made
    pub enabled: bool,
}

impl Default for IllustrationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Result of Stage 2
#[derive(Debug, Default)]
pub struct IllustrationResult {
    /// One patch per draft item, reviews first, in draft order
    pub patches: Vec<ImagePatch>,
    pub images_generated: usize,
    pub images_missing: usize,
}

/// Illustration subject for a review: its image prompt, else its name
pub fn image_prompt_for_review(review: &SponsorshipReview) -> &str {
    subject(review.image_prompt.as_deref(), &review.name)
}

/// Illustration subject for a recommendation: its image prompt, else the program
pub fn image_prompt_for_recommendation(recommendation: &Recommendation) -> &str {
    subject(recommendation.image_prompt.as_deref(), &recommendation.program)
}

fn subject<'a>(image_prompt: Option<&'a str>, fallback: &'a str) -> &'a str {
    image_prompt
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(fallback)
}

/// Generate one illustration. Never fails: any problem is `None`.
pub async fn illustrate<I>(service: &I, subject: &str) -> Option<String>
where
    I: ImageGenerationService + ?Sized,
{
    let prompt = format!(
        "A warm, professional documentary-style photograph for a community sponsorship \
         proposal: {}. No text, no logos, no identifiable faces.",
        subject
    );
    service.generate(&prompt, PROPOSAL_ASPECT_RATIO).await
}

/// Execute Stage 2: one illustration per review and per recommendation.
///
/// All calls run concurrently on the current task. Results are buffered and
/// returned together once every call has finished; the caller merges them.
pub async fn execute_illustration<I>(
    service: &I,
    draft: &ProposalDraft,
    config: &IllustrationConfig,
) -> IllustrationResult
where
    I: ImageGenerationService + ?Sized,
{
    if !config.enabled {
        info!("Stage 2: Illustration disabled, skipping");
        return IllustrationResult::default();
    }

    let targets: Vec<(ItemKind, usize, &str)> = draft
        .sponsorship_reviews
        .iter()
        .enumerate()
        .map(|(i, r)| (ItemKind::Review, i, image_prompt_for_review(r)))
        .chain(
            draft
                .recommendations
                .iter()
                .enumerate()
                .map(|(i, r)| (ItemKind::Recommendation, i, image_prompt_for_recommendation(r))),
        )
        .collect();

    info!("Stage 2: Generating {} illustrations", targets.len());

    let patches = join_all(targets.into_iter().map(|(kind, index, subject)| async move {
        let image_url = illustrate(service, subject).await;
        debug!(
            "Illustration {:?}[{}] {}",
            kind,
            index,
            if image_url.is_some() { "ready" } else { "missing" }
        );
        ImagePatch {
            kind,
            index,
            image_url,
        }
    }))
    .await;

    let images_generated = patches.iter().filter(|p| p.image_url.is_some()).count();
    let images_missing = patches.len() - images_generated;

    info!(
        "Stage 2: {} illustrations ready, {} missing",
        images_generated, images_missing
    );

    IllustrationResult {
        patches,
        images_generated,
        images_missing,
    }
}
