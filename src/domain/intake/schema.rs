//! Field schema - the ordered description of the record an intake collects.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::foundation::ValidationError;

/// One field of the intake record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Stable key used in collected fields and extractor payloads.
    pub key: String,
    /// Whether the field blocks completion until collected.
    #[serde(default = "default_required")]
    pub required: bool,
    /// User-facing display label (may be bilingual).
    pub label: String,
    /// Compact label for the hand-off summary. Falls back to `label`.
    #[serde(default)]
    pub short_label: Option<String>,
}

fn default_required() -> bool {
    true
}

impl FieldDescriptor {
    /// Creates a required field.
    pub fn required(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            required: true,
            label: label.into(),
            short_label: None,
        }
    }

    /// Creates an optional field.
    pub fn optional(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(key, label)
        }
    }

    /// Sets the compact label used in hand-off summaries.
    pub fn with_short_label(mut self, short_label: impl Into<String>) -> Self {
        self.short_label = Some(short_label.into());
        self
    }

    /// Returns the compact label, or the display label if none was set.
    pub fn short_label(&self) -> &str {
        self.short_label.as_deref().unwrap_or(&self.label)
    }
}

/// Ordered list of field descriptors.
///
/// Order matters: missing-field prompts and summaries are rendered in
/// schema order, required fields first as declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    fields: Vec<FieldDescriptor>,
}

impl FieldSchema {
    /// Builds a schema, rejecting empty keys, duplicate keys, and schemas
    /// without any required field.
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self, ValidationError> {
        if fields.is_empty() {
            return Err(ValidationError::empty_field("fields"));
        }

        let mut seen = HashSet::new();
        for field in &fields {
            if field.key.trim().is_empty() {
                return Err(ValidationError::empty_field("field key"));
            }
            if field.label.trim().is_empty() {
                return Err(ValidationError::empty_field(format!("label of {}", field.key)));
            }
            if !seen.insert(field.key.as_str()) {
                return Err(ValidationError::duplicate("field key", field.key.clone()));
            }
        }

        if !fields.iter().any(|f| f.required) {
            return Err(ValidationError::invalid_format(
                "fields",
                "at least one field must be required",
            ));
        }

        Ok(Self { fields })
    }

    /// All fields in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Required fields in declaration order.
    pub fn required(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Optional fields in declaration order.
    pub fn optional(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.required)
    }

    /// Required fields first, then optional ones, each in declaration order.
    pub fn display_order(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.required().chain(self.optional())
    }

    /// Looks up a field by key.
    pub fn get(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Returns true if the key belongs to this schema.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// The support-desk schema the bot ships with: app and wearable
    /// firmware versions, serial numbers, phone details, and the issue.
    pub fn support_desk() -> Self {
        Self {
            fields: support_desk_fields(),
        }
    }
}

impl Default for FieldSchema {
    fn default() -> Self {
        Self::support_desk()
    }
}

/// Field list behind [`FieldSchema::support_desk`].
pub fn support_desk_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::required("issue", "问题描述 / Issue Description").with_short_label("问题描述"),
        FieldDescriptor::required("occur_time", "发生时间 / Time of Occurrence")
            .with_short_label("发生时间"),
        FieldDescriptor::required("reproducible", "是否必现 / Reproducible?")
            .with_short_label("是否必现"),
        FieldDescriptor::required("app_version", "应用版本 / App Version").with_short_label("应用版本"),
        FieldDescriptor::required("glasses_version", "眼镜版本 / Glasses Firmware")
            .with_short_label("眼镜版本"),
        FieldDescriptor::required("glasses_sn", "眼镜SN号 / Glasses SN").with_short_label("眼镜SN号"),
        FieldDescriptor::required("ring_version", "戒指版本 / Ring Firmware")
            .with_short_label("戒指版本"),
        FieldDescriptor::required("ring_sn", "戒指SN号 / Ring SN").with_short_label("戒指SN号"),
        FieldDescriptor::required("phone_model", "手机型号 / Phone Model").with_short_label("手机型号"),
        FieldDescriptor::required("phone_os", "手机系统版本 / Phone OS Version")
            .with_short_label("手机系统版本"),
        FieldDescriptor::optional("vpn", "是否使用VPN / Using VPN?").with_short_label("是否使用VPN"),
    ]
}
