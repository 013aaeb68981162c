//! Intake configuration: the field schema and keyword triggers.

use serde::Deserialize;
use std::time::Duration;

use crate::domain::intake::{support_desk_fields, FieldDescriptor, FieldSchema, KeywordTriggers};

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct IntakeConfig {
    /// Ordered field descriptors
    #[serde(default = "support_desk_fields")]
    pub fields: Vec<FieldDescriptor>,

    #[serde(default = "default_escalation_keywords")]
    pub escalation_keywords: Vec<String>,

    #[serde(default = "default_clear_keywords")]
    pub clear_keywords: Vec<String>,

    #[serde(default = "default_suggestion_prefixes")]
    pub suggestion_prefixes: Vec<String>,

    /// Idle time before an unheld session lock is dropped
    #[serde(default = "default_lock_idle")]
    pub lock_idle_secs: u64,
}

impl IntakeConfig {
    pub fn schema(&self) -> Result<FieldSchema, ValidationError> {
        FieldSchema::new(self.fields.clone()).map_err(|e| ValidationError::InvalidFieldSchema(e.to_string()))
    }

    pub fn triggers(&self) -> KeywordTriggers {
        KeywordTriggers::new(
            self.escalation_keywords.clone(),
            self.clear_keywords.clone(),
            self.suggestion_prefixes.clone(),
        )
    }

    pub fn lock_idle(&self) -> Duration {
        Duration::from_secs(self.lock_idle_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.schema()?;
        if self.lock_idle_secs == 0 {
            return Err(ValidationError::ZeroTtl("lock_idle_secs"));
        }
        Ok(())
    }
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            fields: support_desk_fields(),
            escalation_keywords: default_escalation_keywords(),
            clear_keywords: default_clear_keywords(),
            suggestion_prefixes: default_suggestion_prefixes(),
            lock_idle_secs: default_lock_idle(),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn default_escalation_keywords() -> Vec<String> {
    strings(&["转人工", "人工客服"])
}

fn default_clear_keywords() -> Vec<String> {
    strings(&["清除上下文", "重新开始"])
}

fn default_suggestion_prefixes() -> Vec<String> {
    strings(&["建议", "意见", "反馈建议", "suggestion", "feedback"])
}

fn default_lock_idle() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_build_support_desk_schema() {
        let config = IntakeConfig::default();
        let schema = config.schema().unwrap();
        assert_eq!(schema, FieldSchema::support_desk());
        assert_eq!(config.triggers(), KeywordTriggers::default());
    }

    #[test]
    fn test_duplicate_keys_are_rejected() {
        let config = IntakeConfig {
            fields: vec![
                FieldDescriptor::required("device", "Device"),
                FieldDescriptor::required("device", "Device again"),
            ],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidFieldSchema(_))));
    }

    #[test]
    fn test_schema_without_required_field_is_rejected() {
        let config = IntakeConfig {
            fields: vec![FieldDescriptor::optional("vpn", "VPN")],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_schema_is_rejected() {
        let config = IntakeConfig {
            fields: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_lock_idle_is_rejected() {
        let config = IntakeConfig {
            lock_idle_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::ZeroTtl("lock_idle_secs")));
    }
}
