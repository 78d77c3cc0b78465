use crate::defaults::{DECODER_TIMEOUT, HCOPY_BINARY, HVITE_BINARY, MAX_DECODER_TIMEOUT};
use crate::error::{AlignError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub decoder: DecoderConfig,
    pub lexicon: LexiconConfig,
    pub batch: BatchConfig,
}

/// HTK decoder configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DecoderConfig {
    /// Directory holding `config`, `macros`, `hmmdefs` and `monophones`.
    pub model_dir: Option<PathBuf>,
    pub hcopy: PathBuf,
    pub hvite: PathBuf,
    /// Per-subprocess wall-clock limit.
    pub timeout_secs: u64,
}

/// Pronunciation lexicon configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct LexiconConfig {
    /// CMU-format pronouncing dictionary.
    pub path: Option<PathBuf>,
}

/// Batch driver configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct BatchConfig {
    /// Worker threads; `None` uses all available cores.
    pub workers: Option<usize>,
    /// Parent directory for per-item workspaces; `None` uses the system
    /// temporary directory.
    pub workspace_root: Option<PathBuf>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            model_dir: None,
            hcopy: PathBuf::from(HCOPY_BINARY),
            hvite: PathBuf::from(HVITE_BINARY),
            timeout_secs: DECODER_TIMEOUT.as_secs(),
        }
    }
}

impl DecoderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AlignError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                AlignError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(AlignError::ConfigFileNotFound { .. }) => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - P2FA_MODEL_DIR → decoder.model_dir
    /// - P2FA_LEXICON → lexicon.path
    /// - P2FA_WORKERS → batch.workers
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model_dir) = std::env::var("P2FA_MODEL_DIR")
            && !model_dir.is_empty()
        {
            self.decoder.model_dir = Some(PathBuf::from(model_dir));
        }

        if let Ok(lexicon) = std::env::var("P2FA_LEXICON")
            && !lexicon.is_empty()
        {
            self.lexicon.path = Some(PathBuf::from(lexicon));
        }

        if let Ok(workers) = std::env::var("P2FA_WORKERS")
            && !workers.is_empty()
        {
            match workers.parse::<usize>() {
                Ok(n) => self.batch.workers = Some(n),
                Err(_) => tracing::warn!(value = %workers, "ignoring unparsable P2FA_WORKERS"),
            }
        }

        self
    }

    /// Reject values that parse but cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.decoder.timeout_secs == 0 {
            return Err(AlignError::ConfigInvalidValue {
                key: "decoder.timeout_secs".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.decoder.timeout_secs > MAX_DECODER_TIMEOUT.as_secs() {
            return Err(AlignError::ConfigInvalidValue {
                key: "decoder.timeout_secs".to_string(),
                message: format!("must be at most {}", MAX_DECODER_TIMEOUT.as_secs()),
            });
        }
        if self.batch.workers == Some(0) {
            return Err(AlignError::ConfigInvalidValue {
                key: "batch.workers".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/p2fa/config.toml on Linux, or `None` when the
    /// platform has no config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("p2fa").join("config.toml"))
    }
}
