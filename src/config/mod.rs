//! Application configuration module
//!
//! Configuration is layered with the `config` crate: an optional YAML file,
//! then environment variables with the `INTAKE_RELAY` prefix, using `__` to
//! separate nested values. A `.env` file is loaded first via `dotenvy`.
//!
//! # Example
//!
//! ```no_run
//! use intake_relay::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod error;
mod extractor;
mod intake;
mod platform;
mod redis;
mod server;

pub use error::{ConfigError, ValidationError};
pub use extractor::{ExtractorConfig, ExtractorProvider};
pub use intake::IntakeConfig;
pub use platform::PlatformConfig;
pub use redis::RedisConfig;
pub use server::{Environment, LogFormat, ServerConfig};

use serde::Deserialize;

/// Environment variable naming an alternative config file
pub const CONFIG_FILE_ENV: &str = "INTAKE_RELAY_CONFIG_FILE";

const DEFAULT_CONFIG_FILE: &str = "config/intake-relay.yaml";

/// Keys whose environment values are comma-separated lists
const LIST_KEYS: [&str; 3] = [
    "intake.escalation_keywords",
    "intake.clear_keywords",
    "intake.suggestion_prefixes",
];

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP listener and logging
    #[serde(default)]
    pub server: ServerConfig,

    /// Session and dedup store
    #[serde(default)]
    pub redis: RedisConfig,

    /// Chat platform credentials and hand-off target
    #[serde(default)]
    pub platform: PlatformConfig,

    /// Field extraction
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Field schema and keywords
    #[serde(default)]
    pub intake: IntakeConfig,
}

impl AppConfig {
    /// Load configuration from the config file and environment
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads the YAML file named by `INTAKE_RELAY_CONFIG_FILE`, falling
    ///    back to `config/intake-relay.yaml`; a missing file is not an error
    /// 3. Overlays environment variables with `INTAKE_RELAY` prefix
    ///
    /// # Environment Variable Format
    ///
    /// - `INTAKE_RELAY__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `INTAKE_RELAY__INTAKE__CLEAR_KEYWORDS=reset,clear` -> list
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source cannot be read or values cannot be
    /// parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let path = std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    /// Load configuration using an explicit config file path
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let mut env = config::Environment::default()
            .prefix("INTAKE_RELAY")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .list_separator(",");
        for key in LIST_KEYS {
            env = env.with_list_parse_key(key);
        }

        let config = config::Config::builder()
            .add_source(config::File::new(path, config::FileFormat::Yaml).required(false))
            .add_source(env)
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.redis.validate()?;
        self.platform.validate()?;
        self.extractor.validate()?;
        self.intake.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const MISSING_FILE: &str = "/nonexistent/intake-relay.yaml";

    fn set_minimal_env() {
        env::set_var("INTAKE_RELAY__REDIS__URL", "redis://localhost:6379");
        env::set_var("INTAKE_RELAY__PLATFORM__APP_ID", "cli_a1");
        env::set_var("INTAKE_RELAY__PLATFORM__APP_SECRET", "s3cret");
        env::set_var("INTAKE_RELAY__PLATFORM__HANDOFF_CHAT_ID", "oc_support");
    }

    fn clear_env() {
        for key in [
            "INTAKE_RELAY__REDIS__URL",
            "INTAKE_RELAY__PLATFORM__APP_ID",
            "INTAKE_RELAY__PLATFORM__APP_SECRET",
            "INTAKE_RELAY__PLATFORM__HANDOFF_CHAT_ID",
            "INTAKE_RELAY__SERVER__PORT",
            "INTAKE_RELAY__SERVER__ENVIRONMENT",
            "INTAKE_RELAY__INTAKE__CLEAR_KEYWORDS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load_from(MISSING_FILE);
        clear_env();

        let config = result.expect("config should load");
        assert_eq!(config.redis.url, "redis://localhost:6379");
        assert_eq!(config.platform.handoff_chat_id, "oc_support");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_when_unset() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load_from(MISSING_FILE);
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.redis.session_ttl_secs, 600);
        assert_eq!(config.extractor.provider, ExtractorProvider::Labelled);
        assert_eq!(config.intake.fields.len(), 11);
    }

    #[test]
    fn test_missing_required_values_fail_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let config = AppConfig::load_from(MISSING_FILE).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_is_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("INTAKE_RELAY__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load_from(MISSING_FILE);
        clear_env();

        assert!(result.unwrap().is_production());
    }

    #[test]
    fn test_keyword_list_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("INTAKE_RELAY__INTAKE__CLEAR_KEYWORDS", "wipe,start over");
        let result = AppConfig::load_from(MISSING_FILE);
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.intake.clear_keywords, vec!["wipe", "start over"]);
    }

    #[test]
    fn test_yaml_file_with_env_override() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            r#"
server:
  port: 9000
redis:
  url: "redis://from-file:6379"
  session_ttl_secs: 120
platform:
  app_id: "cli_file"
  app_secret: "file-secret"
  handoff_chat_id: "oc_file"
intake:
  fields:
    - key: device
      label: Device
    - key: vpn
      label: VPN
      required: false
"#
        )
        .unwrap();

        env::set_var("INTAKE_RELAY__SERVER__PORT", "3000");
        let result = AppConfig::load_from(file.path().to_str().unwrap());
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.redis.url, "redis://from-file:6379");
        assert_eq!(config.redis.session_ttl_secs, 120);
        assert_eq!(config.platform.handoff_chat_id, "oc_file");

        let schema = config.intake.schema().unwrap();
        assert_eq!(schema.required().count(), 1);
        assert_eq!(schema.optional().count(), 1);
        assert!(config.validate().is_ok());
    }
}
