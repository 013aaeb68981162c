//! Mock field extractor for testing.
//!
//! Results are consumed in order; once the queue is empty every call
//! returns an empty extraction.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::domain::intake::{CollectedFields, ExtractedFields};
use crate::ports::{ExtractionError, FieldExtractor};

#[derive(Debug, Default)]
struct State {
    results: VecDeque<Result<ExtractedFields, ExtractionError>>,
    calls: Vec<(String, CollectedFields)>,
}

/// Scripted extractor with call tracking.
#[derive(Debug, Clone, Default)]
pub struct MockFieldExtractor {
    state: Arc<Mutex<State>>,
    delay: Duration,
}

impl MockFieldExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful extraction.
    pub fn with_result(self, fields: ExtractedFields) -> Self {
        self.queue_result(fields);
        self
    }

    /// Queues a successful extraction on a shared handle.
    pub fn queue_result(&self, fields: ExtractedFields) {
        self.lock().results.push_back(Ok(fields));
    }

    /// Queues a failure.
    pub fn with_error(self, error: ExtractionError) -> Self {
        self.lock().results.push_back(Err(error));
        self
    }

    /// Sleeps before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Texts and snapshots the extractor was called with.
    pub fn calls(&self) -> Vec<(String, CollectedFields)> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl FieldExtractor for MockFieldExtractor {
    async fn extract(
        &self,
        text: &str,
        collected: &CollectedFields,
    ) -> Result<ExtractedFields, ExtractionError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut state = self.lock();
        state.calls.push((text.to_string(), collected.clone()));
        state.results.pop_front().unwrap_or_else(|| Ok(ExtractedFields::new()))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_queued_results_then_empty() {
        let extractor = MockFieldExtractor::new()
            .with_result(ExtractedFields::new().with("a", "1"))
            .with_error(ExtractionError::Parse("bad".into()));

        let collected = CollectedFields::new();
        assert_eq!(
            extractor.extract("x", &collected).await.unwrap().get("a"),
            Some("1")
        );
        assert!(extractor.extract("y", &collected).await.is_err());
        assert!(extractor.extract("z", &collected).await.unwrap().is_empty());
        assert_eq!(extractor.calls().len(), 3);
    }
}
