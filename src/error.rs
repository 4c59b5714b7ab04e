//! Error types for Mecademic driver operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MecaError>;

#[derive(Error, Debug)]
pub enum MecaError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Firmware update error: {0}")]
    Firmware(String),

    #[error("Invalid firmware version: {0}")]
    Version(#[from] semver::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
