//! Command-line interface for p2fa
//!
//! Provides argument parsing using clap derive macros.

use crate::config::Config;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

/// Phoneme-level forced alignment with the P2FA HTK models
#[derive(Parser, Debug)]
#[command(
    name = "p2fa",
    version,
    about = "Phoneme-level forced alignment with the P2FA HTK models"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: per-item details, -vv: decoder invocations)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Decoder and lexicon overrides shared by the aligning commands.
///
/// Each flag takes precedence over the config file and environment.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct DecoderArgs {
    /// P2FA model directory (config, macros, hmmdefs, monophones)
    #[arg(long, value_name = "DIR")]
    pub model_dir: Option<PathBuf>,

    /// CMU pronouncing dictionary
    #[arg(long, value_name = "PATH")]
    pub lexicon: Option<PathBuf>,

    /// HCopy binary
    #[arg(long, value_name = "PATH")]
    pub hcopy: Option<PathBuf>,

    /// HVite binary
    #[arg(long, value_name = "PATH")]
    pub hvite: Option<PathBuf>,

    /// Time limit per decoder tool. Examples: 90, 90s, 5m
    #[arg(long, value_name = "DURATION", value_parser = parse_timeout)]
    pub timeout: Option<Duration>,

    /// Directory for per-utterance scratch workspaces (default: system temp)
    #[arg(long, value_name = "DIR")]
    pub workspace_root: Option<PathBuf>,
}

impl DecoderArgs {
    /// Overlay the flags that were given onto `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(model_dir) = &self.model_dir {
            config.decoder.model_dir = Some(model_dir.clone());
        }
        if let Some(lexicon) = &self.lexicon {
            config.lexicon.path = Some(lexicon.clone());
        }
        if let Some(hcopy) = &self.hcopy {
            config.decoder.hcopy = hcopy.clone();
        }
        if let Some(hvite) = &self.hvite {
            config.decoder.hvite = hvite.clone();
        }
        if let Some(timeout) = self.timeout {
            config.decoder.timeout_secs = timeout.as_secs().max(1);
        }
        if let Some(root) = &self.workspace_root {
            config.batch.workspace_root = Some(root.clone());
        }
    }
}

/// Parse a timeout string.
///
/// Supports any duration format accepted by `humantime`, plus bare numbers
/// as seconds.
fn parse_timeout(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    // Bare number → seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Alignment file format for directory batches
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    #[value(name = "textgrid")]
    TextGrid,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::TextGrid => "TextGrid",
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Align one transcript against one recording
    Align {
        /// UTF-8 transcript
        text: PathBuf,

        /// WAV recording
        audio: PathBuf,

        /// Output file (.json or .TextGrid)
        output: PathBuf,

        #[command(flatten)]
        decoder: DecoderArgs,
    },

    /// Align many files in parallel
    Batch {
        /// Tab-separated manifest: text, audio, output per line
        #[arg(long, value_name = "PATH", conflicts_with_all = ["audio_dir", "text_dir", "output_dir"], required_unless_present = "audio_dir")]
        manifest: Option<PathBuf>,

        /// Directory of WAV files, paired by stem with --text-dir
        #[arg(long, value_name = "DIR", requires_all = ["text_dir", "output_dir"])]
        audio_dir: Option<PathBuf>,

        /// Directory of .txt transcripts
        #[arg(long, value_name = "DIR")]
        text_dir: Option<PathBuf>,

        /// Directory for alignments produced from --audio-dir
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Output format for --output-dir
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Worker threads (default: all cores)
        #[arg(short = 'j', long, value_name = "N")]
        workers: Option<usize>,

        #[command(flatten)]
        decoder: DecoderArgs,
    },

    /// Print the normalized word sequence of a transcript
    Normalize {
        /// Text to normalize (reads stdin when omitted)
        text: Vec<String>,
    },

    /// Print the dictionary and word sequence the decoder would receive
    Pronounce {
        /// UTF-8 transcript
        text: PathBuf,

        /// CMU pronouncing dictionary
        #[arg(long, value_name = "PATH")]
        lexicon: Option<PathBuf>,
    },

    /// Compare predicted alignments with reference alignments
    Evaluate {
        /// Predicted alignment JSON, or a directory of them
        predicted: PathBuf,

        /// Reference alignment JSON, or a directory matched by file name
        target: PathBuf,

        /// Print the metrics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}
