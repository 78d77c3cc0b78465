use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use p2fa::app::{
    collect_items, evaluate_paths, format_evaluation, normalize_text, pronounce,
    run_align, run_batch_command,
};
use p2fa::cli::{Cli, Commands, DecoderArgs};
use p2fa::config::Config;
use std::io::Read;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match cli.command {
        Commands::Align {
            text,
            audio,
            output,
            decoder,
        } => {
            let config = load_config(cli.config.as_deref(), &decoder)?;
            run_align(&config, &text, &audio, &output, cli.quiet)?;
        }
        Commands::Batch {
            manifest,
            audio_dir,
            text_dir,
            output_dir,
            format,
            workers,
            decoder,
        } => {
            let config = load_config(cli.config.as_deref(), &decoder)?;
            let items = collect_items(
                manifest.as_deref(),
                audio_dir.as_deref(),
                text_dir.as_deref(),
                output_dir.as_deref(),
                format.extension(),
            )?;
            let report = run_batch_command(&config, items, workers, cli.quiet)?;
            if !report.all_succeeded() {
                std::process::exit(1);
            }
        }
        Commands::Normalize { text } => {
            let text = if text.is_empty() {
                let mut input = String::new();
                std::io::stdin()
                    .read_to_string(&mut input)
                    .context("failed to read transcript from stdin")?;
                input
            } else {
                text.join(" ")
            };
            println!("{}", normalize_text(&text));
        }
        Commands::Pronounce { text, lexicon } => {
            let args = DecoderArgs {
                lexicon,
                ..DecoderArgs::default()
            };
            let config = load_config(cli.config.as_deref(), &args)?;
            print!("{}", pronounce(&config, &text)?);
        }
        Commands::Evaluate {
            predicted,
            target,
            json,
        } => {
            let evaluation = evaluate_paths(&predicted, &target)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&evaluation)?);
            } else {
                println!("{}", format_evaluation(&evaluation));
            }
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "p2fa", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Log to stderr. `RUST_LOG` wins over -q/-v.
fn init_logging(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("p2fa={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load configuration from file or use defaults.
///
/// Priority order (highest first):
/// 1. Command-line flags
/// 2. Environment variables (P2FA_MODEL_DIR, P2FA_LEXICON, P2FA_WORKERS)
/// 3. Custom config path from CLI (--config), else ~/.config/p2fa/config.toml
/// 4. Built-in defaults
fn load_config(custom_path: Option<&std::path::Path>, args: &DecoderArgs) -> Result<Config> {
    let config = match (custom_path, Config::default_path()) {
        (Some(path), _) => Config::load(path)?,
        (None, Some(default_path)) => Config::load_or_default(&default_path)?,
        (None, None) => Config::default(),
    };

    let mut config = config.with_env_overrides();
    args.apply(&mut config);
    config.validate()?;
    Ok(config)
}
