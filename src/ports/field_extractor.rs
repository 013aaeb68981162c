//! Field Extractor Port - pulls field values out of free text.
//!
//! The extractor is a swappable capability: a model-backed client, a
//! rule-based parser, or a test double. The merge rules never depend on
//! which one is plugged in.

use async_trait::async_trait;

use crate::domain::intake::{CollectedFields, ExtractedFields};

/// Port for extracting field values from one user message.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    /// Extract values newly present in `text`.
    ///
    /// `collected` is the snapshot of values already known. Implementations
    /// should not echo those back and should leave a key empty rather than
    /// return a placeholder word.
    async fn extract(
        &self,
        text: &str,
        collected: &CollectedFields,
    ) -> Result<ExtractedFields, ExtractionError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Errors from field extraction. The engine logs these and continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    /// Extraction service is unavailable.
    #[error("extractor unavailable: {0}")]
    Unavailable(String),

    /// Request timed out.
    #[error("extraction timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Output could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// The service answered but the answer was unusable.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
