use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

/// Reference material attached inline to the drafting request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceDocument {
    /// Original file name, used only for logging and prompt context
    pub name: String,
    /// Document bytes, base64 encoded for inline transport
    pub payload: String,
    pub mime_type: String,
}

impl EvidenceDocument {
    /// Encode raw bytes into an inline document.
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: BASE64.encode(bytes),
            mime_type: mime_type.into(),
        }
    }

    /// Size of the decoded document in bytes
    pub fn decoded_len(&self) -> usize {
        // base64 pads to a multiple of 4; each quad carries 3 bytes
        let padding = self.payload.bytes().rev().take_while(|&b| b == b'=').count();
        (self.payload.len() / 4 * 3).saturating_sub(padding)
    }
}

/// Append-only collection of evidence accumulated across upload batches.
#[derive(Debug, Clone, Default)]
pub struct EvidenceSet {
    pub(crate) documents: Vec<EvidenceDocument>,
}

impl EvidenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn documents(&self) -> &[EvidenceDocument] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Append an already-encoded batch in one step.
    pub fn extend(&mut self, batch: Vec<EvidenceDocument>) {
        self.documents.extend(batch);
    }
}
