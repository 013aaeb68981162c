//! Rule-based extractor reading `label: value` lines.
//!
//! A line matches a field when the text before the first `:` or `：`
//! equals the field key, its display label, either half of a bilingual
//! `中文 / English` label, or its short label, ignoring case. Used when no
//! model-backed extractor is configured.

use async_trait::async_trait;

use crate::domain::intake::{normalize_value, CollectedFields, ExtractedFields, FieldDescriptor, FieldSchema};
use crate::ports::{ExtractionError, FieldExtractor};

/// Extractor that needs no external service.
#[derive(Debug, Clone)]
pub struct LabelledFieldExtractor {
    schema: FieldSchema,
}

impl LabelledFieldExtractor {
    pub fn new(schema: FieldSchema) -> Self {
        Self { schema }
    }

    fn field_for(&self, label: &str) -> Option<&FieldDescriptor> {
        let label = normalize_label(label);
        if label.is_empty() {
            return None;
        }
        self.schema
            .fields()
            .iter()
            .find(|field| aliases(field).any(|alias| alias == label))
    }
}

fn aliases(field: &FieldDescriptor) -> impl Iterator<Item = String> + '_ {
    let halves = field.label.split(" / ").map(str::to_string);
    [field.key.clone(), field.label.clone(), field.short_label().to_string()]
        .into_iter()
        .chain(halves)
        .map(|alias| normalize_label(&alias))
}

fn normalize_label(label: &str) -> String {
    label.trim().trim_end_matches(['?', '？']).trim().to_lowercase()
}

fn split_line(line: &str) -> Option<(&str, &str)> {
    let idx = line.find([':', '：'])?;
    let sep_len = line[idx..].chars().next().map(char::len_utf8)?;
    Some((&line[..idx], &line[idx + sep_len..]))
}

#[async_trait]
impl FieldExtractor for LabelledFieldExtractor {
    async fn extract(
        &self,
        text: &str,
        collected: &CollectedFields,
    ) -> Result<ExtractedFields, ExtractionError> {
        let mut extracted = ExtractedFields::new();

        for line in text.lines() {
            let line = line.trim().trim_start_matches(['-', '*', '•']).trim();
            let Some((label, value)) = split_line(line) else {
                continue;
            };
            let Some(field) = self.field_for(label) else {
                continue;
            };
            let Some(value) = normalize_value(value) else {
                continue;
            };
            if collected.get(&field.key) == Some(value) {
                continue;
            }
            extracted.insert(field.key.clone(), value);
        }

        Ok(extracted)
    }

    fn name(&self) -> &'static str {
        "labelled"
    }
}
