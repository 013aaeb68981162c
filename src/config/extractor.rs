//! Field extractor configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Field extractor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    /// Which extractor to run
    #[serde(default)]
    pub provider: ExtractorProvider,

    /// API key for the chat-completions endpoint
    #[serde(default)]
    pub api_key: Option<Secret<String>>,

    /// Base URL of an OpenAI-compatible API
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Extractor implementation
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorProvider {
    /// OpenAI-compatible chat completions
    Llm,
    /// `label: value` lines, no external service
    #[default]
    Labelled,
}

impl ExtractorConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check if an API key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().is_empty())
    }

    /// Validate extractor configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ValidationError::InvalidTemperature(self.temperature));
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }

        if self.provider == ExtractorProvider::Llm {
            if !self.has_api_key() {
                return Err(ValidationError::MissingRequired("EXTRACTOR__API_KEY"));
            }
            if self.base_url.as_deref().map_or(true, str::is_empty) {
                return Err(ValidationError::MissingRequired("EXTRACTOR__BASE_URL"));
            }
            if self.model.as_deref().map_or(true, str::is_empty) {
                return Err(ValidationError::MissingRequired("EXTRACTOR__MODEL"));
            }
        }
        Ok(())
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            provider: ExtractorProvider::default(),
            api_key: None,
            base_url: None,
            model: None,
            temperature: default_temperature(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_temperature() -> f32 {
    0.1
}

fn default_timeout() -> u64 {
    15
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm() -> ExtractorConfig {
        ExtractorConfig {
            provider: ExtractorProvider::Llm,
            api_key: Some(Secret::new("sk-test".to_string())),
            base_url: Some("https://api.example.com/v1".to_string()),
            model: Some("gpt-4o-mini".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_need_no_credentials() {
        let config = ExtractorConfig::default();
        assert_eq!(config.provider, ExtractorProvider::Labelled);
        assert_eq!(config.timeout(), Duration::from_secs(15));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_llm_requires_api_key() {
        let config = ExtractorConfig { api_key: None, ..llm() };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("EXTRACTOR__API_KEY"))
        );
    }

    #[test]
    fn test_llm_requires_model() {
        let config = ExtractorConfig {
            model: Some(String::new()),
            ..llm()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_llm_config() {
        assert!(llm().validate().is_ok());
    }

    #[test]
    fn test_temperature_range() {
        let config = ExtractorConfig {
            temperature: 3.5,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidTemperature(3.5)));
    }
}
