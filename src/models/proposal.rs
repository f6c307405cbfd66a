use serde::{Deserialize, Serialize};

/// Look back at one product line the business already sponsored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipReview {
    /// Product or program name, as it appears in the spend breakdown
    pub name: String,
    /// Historical spend on this product
    pub amount: f64,
    /// Short impact narrative
    pub narrative: String,
    /// Dedicated description for the illustration, if the model wrote one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,
    /// Filled by the illustration phase only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Forward-looking program suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub program: String,
    pub reasoning: String,
    /// Free-form investment suggestion, e.g. "$5,000 - $7,500"
    pub suggested_investment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Structured proposal content as produced by the drafting phase.
///
/// Array lengths and order are fixed once drafted; illustration only fills
/// `image_url` fields through [`ProposalDraft::apply_patches`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalDraft {
    pub summary: String,
    pub analysis: String,
    pub sponsorship_reviews: Vec<SponsorshipReview>,
    pub recommendations: Vec<Recommendation>,
}

/// Which draft array an image belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Review,
    Recommendation,
}

/// One illustration result, addressed by array and position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePatch {
    pub kind: ItemKind,
    pub index: usize,
    pub image_url: Option<String>,
}

impl ProposalDraft {
    /// Number of items that get an illustration
    pub fn item_count(&self) -> usize {
        self.sponsorship_reviews.len() + self.recommendations.len()
    }

    /// Count of items that already carry an image
    pub fn illustrated_count(&self) -> usize {
        self.sponsorship_reviews
            .iter()
            .filter(|r| r.image_url.is_some())
            .count()
            + self
                .recommendations
                .iter()
                .filter(|r| r.image_url.is_some())
                .count()
    }

    /// Apply image patches by exact position.
    ///
    /// Patches pointing past the end of an array are ignored, so arrays are
    /// never resized or reordered. Returns the number of patches applied.
    pub fn apply_patches(&mut self, patches: &[ImagePatch]) -> usize {
        let mut applied = 0;

        for patch in patches {
            let slot = match patch.kind {
                ItemKind::Review => self
                    .sponsorship_reviews
                    .get_mut(patch.index)
                    .map(|r| &mut r.image_url),
                ItemKind::Recommendation => self
                    .recommendations
                    .get_mut(patch.index)
                    .map(|r| &mut r.image_url),
            };

            if let Some(slot) = slot {
                *slot = patch.image_url.clone();
                applied += 1;
            }
        }

        applied
    }
}
