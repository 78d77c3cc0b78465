//! Error types for p2fa.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlignError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Input errors
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Audio error: {message}")]
    Audio { message: String },

    #[error("Pronunciation lexicon error: {message}")]
    Lexicon { message: String },

    // Decoder errors
    #[error("Decoder tool not found: {tool}")]
    DecoderToolNotFound { tool: String },

    #[error("Decoder {tool} failed: {message}")]
    DecoderFailed { tool: String, message: String },

    #[error("Decoder {tool} timed out after {}", humanize(.timeout))]
    DecoderTimeout { tool: String, timeout: Duration },

    #[error("Malformed decoder output: {message}")]
    DecoderOutput { message: String },

    // Correction errors
    #[error("Alignment correction failed: {message}")]
    Correction { message: String },

    // Persistence errors
    #[error("Alignment format error: {message}")]
    AlignmentFormat { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

/// Coarse failure class used in batch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Input,
    Decoder,
    Correction,
    Environment,
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Input => "input",
            Self::Decoder => "decoder",
            Self::Correction => "correction",
            Self::Environment => "environment",
        };
        f.write_str(name)
    }
}

impl AlignError {
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::InvalidInput { .. } | Self::Audio { .. } => FailureCategory::Input,
            Self::DecoderToolNotFound { .. }
            | Self::DecoderFailed { .. }
            | Self::DecoderTimeout { .. }
            | Self::DecoderOutput { .. } => FailureCategory::Decoder,
            Self::Correction { .. } => FailureCategory::Correction,
            _ => FailureCategory::Environment,
        }
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub(crate) fn correction(message: impl Into<String>) -> Self {
        Self::Correction {
            message: message.into(),
        }
    }

    pub(crate) fn decoder_output(message: impl Into<String>) -> Self {
        Self::DecoderOutput {
            message: message.into(),
        }
    }
}

fn humanize(timeout: &Duration) -> String {
    if timeout.subsec_millis() == 0 {
        format!("{}s", timeout.as_secs())
    } else {
        format!("{}ms", timeout.as_millis())
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, AlignError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_file_not_found_display() {
        let error = AlignError::ConfigFileNotFound {
            path: "/path/to/config.toml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found at /path/to/config.toml"
        );
    }

    #[test]
    fn test_config_invalid_value_display() {
        let error = AlignError::ConfigInvalidValue {
            key: "decoder.model_dir".to_string(),
            message: "missing hmmdefs".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for decoder.model_dir: missing hmmdefs"
        );
    }

    #[test]
    fn test_decoder_failed_display() {
        let error = AlignError::DecoderFailed {
            tool: "HVite".to_string(),
            message: "exit status: 1".to_string(),
        };
        assert_eq!(error.to_string(), "Decoder HVite failed: exit status: 1");
    }

    #[test]
    fn test_decoder_timeout_display_whole_seconds() {
        let error = AlignError::DecoderTimeout {
            tool: "HVite".to_string(),
            timeout: Duration::from_secs(300),
        };
        assert_eq!(error.to_string(), "Decoder HVite timed out after 300s");
    }

    #[test]
    fn test_decoder_timeout_display_millis() {
        let error = AlignError::DecoderTimeout {
            tool: "HCopy".to_string(),
            timeout: Duration::from_millis(250),
        };
        assert_eq!(error.to_string(), "Decoder HCopy timed out after 250ms");
    }

    #[test]
    fn test_correction_display() {
        let error = AlignError::correction("no phoneme segments");
        assert_eq!(
            error.to_string(),
            "Alignment correction failed: no phoneme segments"
        );
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            AlignError::invalid_input("empty").category(),
            FailureCategory::Input
        );
        assert_eq!(
            AlignError::Audio {
                message: "bad wav".to_string()
            }
            .category(),
            FailureCategory::Input
        );
        assert_eq!(
            AlignError::DecoderToolNotFound {
                tool: "HCopy".to_string()
            }
            .category(),
            FailureCategory::Decoder
        );
        assert_eq!(
            AlignError::decoder_output("garbage").category(),
            FailureCategory::Decoder
        );
        assert_eq!(
            AlignError::correction("negative").category(),
            FailureCategory::Correction
        );
        assert_eq!(
            AlignError::Other("x".to_string()).category(),
            FailureCategory::Environment
        );
    }

    #[test]
    fn test_category_display() {
        assert_eq!(FailureCategory::Decoder.to_string(), "decoder");
        assert_eq!(FailureCategory::Environment.to_string(), "environment");
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: AlignError = io_error.into();
        assert!(error.to_string().contains("file not found"));
        assert_eq!(error.category(), FailureCategory::Environment);
    }

    #[test]
    fn test_from_toml_error() {
        let toml_error = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let error: AlignError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_error_source_chain_io() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let error: AlignError = io_error.into();

        let error_trait: &dyn std::error::Error = &error;
        assert!(error_trait.source().is_some());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<AlignError>();
        assert_sync::<AlignError>();
    }
}
