//! Chat platform configuration (Lark / Feishu open platform)

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Credentials and targets for the chat platform
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    /// Open API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub app_id: String,

    #[serde(default = "empty_secret")]
    pub app_secret: Secret<String>,

    /// Chat that receives hand-off posts
    #[serde(default)]
    pub handoff_chat_id: String,

    /// Token expected on inbound event callbacks
    #[serde(default)]
    pub verification_token: Option<Secret<String>>,

    /// Deadline for each platform API call, in seconds
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
}

impl PlatformConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// The verification token, if one is configured and non-empty.
    pub fn verification_token(&self) -> Option<&str> {
        self.verification_token
            .as_ref()
            .map(|t| t.expose_secret().as_str())
            .filter(|t| !t.is_empty())
    }

    /// Validate platform configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.base_url.starts_with("https://") && !self.base_url.starts_with("http://") {
            return Err(ValidationError::InvalidPlatformUrl);
        }
        if self.app_id.is_empty() {
            return Err(ValidationError::MissingRequired("PLATFORM__APP_ID"));
        }
        if self.app_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("PLATFORM__APP_SECRET"));
        }
        if self.handoff_chat_id.is_empty() {
            return Err(ValidationError::MissingRequired("PLATFORM__HANDOFF_CHAT_ID"));
        }
        if self.call_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            app_id: String::new(),
            app_secret: empty_secret(),
            handoff_chat_id: String::new(),
            verification_token: None,
            call_timeout_secs: default_call_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://open.feishu.cn/open-apis".to_string()
}

fn empty_secret() -> Secret<String> {
    Secret::new(String::new())
}

fn default_call_timeout() -> u64 {
    5
}
