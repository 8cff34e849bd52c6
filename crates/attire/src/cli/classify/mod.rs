//! The `attire classify` command.

mod batch;
mod setup;
pub mod types;

pub use types::OutputFormat;

use attire_core::{GarmentProcessor, OutputFormat as CoreOutputFormat, ProcessOptions};
use clap::Args;
use std::path::PathBuf;

use batch::run;
use setup::setup_processor;

/// Arguments for the `classify` command.
#[derive(Args, Debug, Default)]
pub struct ClassifyArgs {
    /// Garment image or directory of images
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (defaults to `output.format` from the config)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Include per-label probabilities for every axis
    #[arg(long)]
    pub explain: bool,

    /// Embed the normalized image as base64 PNG
    #[arg(long)]
    pub include_image: bool,

    /// Write each normalized image to this directory as `<name>_norm.png`
    #[arg(long, value_name = "DIR")]
    pub save_normalized: Option<PathBuf>,

    /// Override the color axis threshold
    #[arg(long, value_name = "X")]
    pub color_threshold: Option<f32>,

    /// Override the pattern axis threshold
    #[arg(long, value_name = "X")]
    pub pattern_threshold: Option<f32>,

    /// Override the type axis threshold
    #[arg(long, value_name = "X")]
    pub type_threshold: Option<f32>,
}

/// Everything a run needs, assembled by `setup_processor`.
pub(crate) struct ClassifyContext {
    pub processor: GarmentProcessor,
    pub options: ProcessOptions,
    pub output_format: CoreOutputFormat,
    pub pretty: bool,
}

/// Execute the classify command.
pub async fn execute(args: ClassifyArgs) -> anyhow::Result<()> {
    let ctx = setup_processor(&args)?;

    let files = ctx.processor.discover(&args.input);
    if files.is_empty() {
        tracing::warn!("No supported image files found at {:?}", args.input);
        return Ok(());
    }
    tracing::info!("Found {} image(s) to classify", files.len());

    run(ctx, &args, files).await
}
