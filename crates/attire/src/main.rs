//! Attire CLI - zero-shot garment color, pattern and type classification.
//!
//! Each garment photo is normalized, scored against an ensemble of text
//! prompts by a CLIP model, and answered per axis with a label or
//! `uncertain` when the model is not confident enough.
//!
//! # Usage
//!
//! ```bash
//! # Classify a single image
//! attire classify shirt.png
//!
//! # Classify a directory, one JSON object per line
//! attire classify ./closet/ --format jsonl --output closet.jsonl
//!
//! # Show per-label probabilities
//! attire classify shirt.png --explain
//!
//! # Fetch the model, inspect labels and configuration
//! attire models download
//! attire labels --axis pattern
//! attire config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Attire - zero-shot garment attribute classification.
#[derive(Parser, Debug)]
#[command(name = "attire")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify garment images by color, pattern and type
    Classify(cli::classify::ClassifyArgs),

    /// Download and inspect the CLIP model files
    Models(cli::models::ModelsArgs),

    /// View and initialize configuration
    Config(cli::config::ConfigArgs),

    /// List the labels and prompt templates of each axis
    Labels(cli::labels::LabelsArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't up yet, so config problems go straight to stderr.
    let config = match attire_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `attire config path`."
            );
            attire_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Attire v{}", attire_core::VERSION);

    match cli.command {
        Commands::Classify(args) => cli::classify::execute(args).await,
        Commands::Models(args) => cli::models::execute(args).await,
        Commands::Config(args) => cli::config::execute(args).await,
        Commands::Labels(args) => cli::labels::execute(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_classify_flags() {
        let parsed = Cli::try_parse_from([
            "attire",
            "-v",
            "classify",
            "shirt.png",
            "--format",
            "jsonl",
            "--explain",
            "--type-threshold",
            "0.7",
        ])
        .unwrap();
        assert!(parsed.verbose);
        match parsed.command {
            Commands::Classify(args) => {
                assert_eq!(args.input, std::path::PathBuf::from("shirt.png"));
                assert_eq!(args.format, Some(cli::classify::OutputFormat::Jsonl));
                assert!(args.explain);
                assert_eq!(args.type_threshold, Some(0.7));
                assert!(args.color_threshold.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
