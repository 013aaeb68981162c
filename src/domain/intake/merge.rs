//! Merging extractor output into a session.
//!
//! The extractor only ever adds or overwrites values. A blank or
//! placeholder value for a field is skipped, so previously collected data
//! can never be erased by a later extraction.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::schema::{FieldDescriptor, FieldSchema};
use super::session::Session;

/// Values the extractor sometimes returns instead of leaving a field blank.
static PLACEHOLDERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "未提供", "无", "未知", "不知道", "暂无", "null", "none", "n/a", "na", "unknown", "-",
    ]
    .into_iter()
    .collect()
});

/// Partial field map returned by a field extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedFields(BTreeMap<String, String>);

impl ExtractedFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(String, String)> for ExtractedFields {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Whether a merge filled an empty field or replaced an existing value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Collected,
    Updated,
}

/// One field changed by a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub key: String,
    pub label: String,
    pub value: String,
    pub kind: ChangeKind,
}

impl FieldChange {
    /// Human-readable note for the reply, e.g. `应用版本: 2.1.0（已更新）`.
    pub fn note(&self) -> String {
        match self.kind {
            ChangeKind::Collected => format!("{}: {}", self.label, self.value),
            ChangeKind::Updated => format!("{}: {}（已更新）", self.label, self.value),
        }
    }
}

/// Trims a value and drops blanks and known placeholder words.
pub fn normalize_value(raw: &str) -> Option<&str> {
    let value = raw.trim();
    if value.is_empty() || PLACEHOLDERS.contains(value.to_lowercase().as_str()) {
        return None;
    }
    Some(value)
}

/// Applies an extraction to a session, returning the changes in schema order.
///
/// Keys outside the schema are ignored.
pub fn merge_extraction(
    session: &mut Session,
    schema: &FieldSchema,
    extracted: &ExtractedFields,
) -> Vec<FieldChange> {
    schema
        .fields()
        .iter()
        .filter_map(|field| merge_field(session, field, extracted))
        .collect()
}

fn merge_field(
    session: &mut Session,
    field: &FieldDescriptor,
    extracted: &ExtractedFields,
) -> Option<FieldChange> {
    let value = extracted.get(&field.key).and_then(normalize_value)?;
    let prior = session.collected().get(&field.key);
    if prior == Some(value) {
        return None;
    }

    let kind = if prior.is_some() {
        ChangeKind::Updated
    } else {
        ChangeKind::Collected
    };
    let value = value.to_string();
    session.set_field(field, &value);

    Some(FieldChange {
        key: field.key.clone(),
        label: field.short_label().to_string(),
        value,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{SessionKey, UserId};
    use proptest::prelude::*;

    fn schema() -> FieldSchema {
        FieldSchema::new(vec![
            FieldDescriptor::required("a", "Alpha"),
            FieldDescriptor::required("b", "Beta"),
            FieldDescriptor::optional("c", "Gamma"),
        ])
        .unwrap()
    }

    fn session() -> Session {
        Session::new(SessionKey::new("chat"), UserId::new("ou"), None)
    }

    #[test]
    fn new_values_are_collected() {
        let schema = schema();
        let mut s = session();
        let changes = merge_extraction(&mut s, &schema, &ExtractedFields::new().with("a", "v1"));

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Collected);
        assert_eq!(changes[0].note(), "Alpha: v1");
        assert_eq!(s.collected().get("a"), Some("v1"));
    }

    #[test]
    fn different_value_is_an_update() {
        let schema = schema();
        let mut s = session();
        merge_extraction(&mut s, &schema, &ExtractedFields::new().with("a", "v1"));
        let changes = merge_extraction(&mut s, &schema, &ExtractedFields::new().with("a", "v2"));

        assert_eq!(changes[0].kind, ChangeKind::Updated);
        assert_eq!(changes[0].note(), "Alpha: v2（已更新）");
        assert_eq!(s.collected().get("a"), Some("v2"));
    }

    #[test]
    fn same_value_produces_no_change() {
        let schema = schema();
        let mut s = session();
        let extraction = ExtractedFields::new().with("a", "v1");
        merge_extraction(&mut s, &schema, &extraction);
        assert!(merge_extraction(&mut s, &schema, &extraction).is_empty());
    }

    #[test]
    fn placeholders_and_blanks_are_dropped() {
        let schema = schema();
        let mut s = session();
        let extraction = ExtractedFields::new()
            .with("a", "N/A")
            .with("b", "  ")
            .with("c", "未知");
        assert!(merge_extraction(&mut s, &schema, &extraction).is_empty());
        assert!(s.collected().is_empty());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let schema = schema();
        let mut s = session();
        let changes = merge_extraction(&mut s, &schema, &ExtractedFields::new().with("zzz", "x"));
        assert!(changes.is_empty());
        assert!(!s.collected().contains("zzz"));
    }

    #[test]
    fn values_are_trimmed() {
        assert_eq!(normalize_value("  2.1.0 \n"), Some("2.1.0"));
        assert_eq!(normalize_value("None"), None);
    }

    fn extraction_strategy() -> impl Strategy<Value = ExtractedFields> {
        let value = prop_oneof![
            Just(String::new()),
            Just("n/a".to_string()),
            "[a-z0-9]{1,8}",
        ];
        proptest::collection::btree_map(prop_oneof![Just("a"), Just("b"), Just("c"), Just("x")], value, 0..4)
            .prop_map(|m| m.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    proptest! {
        #[test]
        fn merge_is_idempotent(extraction in extraction_strategy()) {
            let schema = schema();
            let mut once = session();
            merge_extraction(&mut once, &schema, &extraction);

            let mut twice = once.clone();
            let second = merge_extraction(&mut twice, &schema, &extraction);

            prop_assert!(second.is_empty());
            prop_assert_eq!(once.collected(), twice.collected());
        }

        #[test]
        fn merge_never_erases(
            first in extraction_strategy(),
            second in extraction_strategy(),
        ) {
            let schema = schema();
            let mut s = session();
            merge_extraction(&mut s, &schema, &first);
            let before = s.collected().clone();
            merge_extraction(&mut s, &schema, &second);

            for (key, _) in before.iter() {
                prop_assert!(s.collected().contains(key));
            }
        }

        #[test]
        fn completion_is_monotonic(steps in proptest::collection::vec(extraction_strategy(), 1..6)) {
            let schema = schema();
            let mut s = session();
            let mut was_complete = false;
            for extraction in &steps {
                merge_extraction(&mut s, &schema, extraction);
                let complete = s.is_complete(&schema);
                prop_assert!(!was_complete || complete);
                was_complete = complete;
            }
        }
    }
}
