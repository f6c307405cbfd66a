use std::fmt;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::GenerationError;
use crate::llm::{ImageGenerationService, TextGenerationService};
use crate::models::{EvidenceDocument, ImagePatch, ProposalDraft, SpendRecord};
use crate::stages::{IllustrationConfig, execute_draft, execute_illustration};

/// Monotonic id of one generation attempt. Zero means "never selected".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttemptId(u64);

impl AttemptId {
    fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of the current attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Drafting,
    Illustrating,
    Done,
    Failed,
}

/// Everything an observer of the session can see
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub attempt: AttemptId,
    /// Business name of the current selection
    pub selection: Option<String>,
    pub phase: Phase,
    pub draft: Option<ProposalDraft>,
    pub error: Option<String>,
}

/// How a call to [`ProposalSession::select`] ended
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionOutcome {
    /// The attempt ran to the end and its draft is the session's current draft
    Completed(ProposalDraft),
    /// A newer selection took over; nothing from this attempt was kept
    Superseded,
}

/// Single-user proposal session.
///
/// Holds the one observable state slot and is the only thing that mutates it.
/// Every mutation after the start of an attempt first checks that the attempt
/// is still current, so results from a superseded selection are dropped
/// instead of leaking into the newer one. In-flight calls are never aborted.
pub struct ProposalSession<T, I> {
    text: T,
    images: I,
    illustration: IllustrationConfig,
    state: watch::Sender<SessionSnapshot>,
}

impl<T, I> ProposalSession<T, I>
where
    T: TextGenerationService,
    I: ImageGenerationService,
{
    pub fn new(text: T, images: I) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::default());
        Self {
            text,
            images,
            illustration: IllustrationConfig::default(),
            state,
        }
    }

    pub fn with_illustration(mut self, config: IllustrationConfig) -> Self {
        self.illustration = config;
        self
    }

    /// Current state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Receive every published state change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    pub fn current_attempt(&self) -> AttemptId {
        self.state.borrow().attempt
    }

    /// Select a business and run both phases for it.
    ///
    /// The draft is published as soon as drafting succeeds, then the
    /// illustrations are generated concurrently and merged in one step.
    /// Returns `Superseded` if another selection started in the meantime.
    pub async fn select(
        &self,
        record: &SpendRecord,
        evidence: &[EvidenceDocument],
    ) -> Result<SelectionOutcome, GenerationError> {
        let attempt = self.begin(record);
        info!(
            "Attempt {}: selected {} ({} evidence documents)",
            attempt,
            record.business_name(),
            evidence.len()
        );

        let draft = match execute_draft(&self.text, record, evidence).await {
            Ok(draft) => draft,
            Err(e) => {
                return if self.fail(attempt, &e) {
                    Err(e)
                } else {
                    debug!("Attempt {}: failure discarded, superseded: {}", attempt, e);
                    Ok(SelectionOutcome::Superseded)
                };
            }
        };

        if !self.publish_draft(attempt, &draft) {
            debug!("Attempt {}: draft discarded, superseded", attempt);
            return Ok(SelectionOutcome::Superseded);
        }

        let illustrations = execute_illustration(&self.images, &draft, &self.illustration).await;

        match self.merge(attempt, &illustrations.patches) {
            Some(merged) => {
                info!(
                    "Attempt {}: done, {}/{} items illustrated",
                    attempt,
                    merged.illustrated_count(),
                    merged.item_count()
                );
                Ok(SelectionOutcome::Completed(merged))
            }
            None => {
                debug!(
                    "Attempt {}: {} illustrations discarded, superseded",
                    attempt,
                    illustrations.patches.len()
                );
                Ok(SelectionOutcome::Superseded)
            }
        }
    }

    /// Start a new attempt: bump the id and clear the previous result
    fn begin(&self, record: &SpendRecord) -> AttemptId {
        let mut attempt = AttemptId::default();
        self.state.send_modify(|state| {
            state.attempt = state.attempt.next();
            state.selection = Some(record.business_name().to_string());
            state.phase = Phase::Drafting;
            state.draft = None;
            state.error = None;
            attempt = state.attempt;
        });
        attempt
    }

    /// Apply `update` only if `attempt` is still the current one
    fn update_if_current(
        &self,
        attempt: AttemptId,
        update: impl FnOnce(&mut SessionSnapshot),
    ) -> bool {
        self.state.send_if_modified(|state| {
            if state.attempt != attempt {
                return false;
            }
            update(state);
            true
        })
    }

    fn publish_draft(&self, attempt: AttemptId, draft: &ProposalDraft) -> bool {
        self.update_if_current(attempt, |state| {
            state.draft = Some(draft.clone());
            state.phase = Phase::Illustrating;
        })
    }

    fn merge(&self, attempt: AttemptId, patches: &[ImagePatch]) -> Option<ProposalDraft> {
        let mut merged = None;
        self.update_if_current(attempt, |state| {
            if let Some(draft) = state.draft.as_mut() {
                draft.apply_patches(patches);
                merged = Some(draft.clone());
            }
            state.phase = Phase::Done;
        });
        merged
    }

    fn fail(&self, attempt: AttemptId, error: &GenerationError) -> bool {
        let current = self.update_if_current(attempt, |state| {
            state.draft = None;
            state.phase = Phase::Failed;
            state.error = Some(error.to_string());
        });
        if current {
            warn!("Attempt {}: failed: {}", attempt, error);
        }
        current
    }
}
