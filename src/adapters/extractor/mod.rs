//! Field extractor adapters.
//!
//! - `LlmFieldExtractor` - OpenAI-compatible chat-completions client
//! - `LabelledFieldExtractor` - rule-based `label: value` parser
//! - `MockFieldExtractor` - scripted results for tests

mod labelled_extractor;
mod llm_extractor;
mod mock_extractor;

pub use labelled_extractor::LabelledFieldExtractor;
pub use llm_extractor::{LlmExtractorConfig, LlmFieldExtractor};
pub use mock_extractor::MockFieldExtractor;
