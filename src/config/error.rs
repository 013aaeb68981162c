//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Server host must be an IP address: {0}")]
    InvalidHost(String),

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("{0} must be greater than zero")]
    ZeroTtl(&'static str),

    #[error("Platform base URL must use http or https")]
    InvalidPlatformUrl,

    #[error("Invalid extractor temperature: {0}")]
    InvalidTemperature(f32),

    #[error("Invalid field schema: {0}")]
    InvalidFieldSchema(String),
}
