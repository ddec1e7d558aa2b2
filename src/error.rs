use thiserror::Error;

/// Errors surfaced to callers of the detectors.
///
/// Only structurally invalid input ends up here. Empty candidate sets and
/// degenerate regions degrade to the sentinel non-detection instead.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("Invalid image shape: expected 1 or 3 channels, got {channels}")]
    InvalidImageShape { channels: u8 },

    #[error("Invalid configuration value `{key}`: {reason}")]
    InvalidConfig { key: &'static str, reason: String },

    #[error("Failed to read config file: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl DetectError {
    pub(crate) fn config(key: &'static str, reason: impl Into<String>) -> Self {
        DetectError::InvalidConfig {
            key,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DetectError>;
