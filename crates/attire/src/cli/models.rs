//! `attire models`: fetch and inspect the CLIP model files.

use std::path::{Path, PathBuf};

use anyhow::Context;
use attire_core::embedding::{TEXT_MODEL_FILENAME, TOKENIZER_FILENAME, VISION_MODEL_FILENAME};
use attire_core::{ClipScorer, Config};
use clap::{Args, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

/// Arguments for the `models` command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Model subcommands.
#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// Download the CLIP vision encoder, text encoder and tokenizer
    Download {
        /// Download again even if files are present
        #[arg(long)]
        force: bool,
    },

    /// Show which model files are installed
    List,

    /// Print the model directory path
    Path,
}

/// One file of a model repository and where it lands locally.
struct ModelFile {
    remote_path: &'static str,
    local_name: &'static str,
    label: &'static str,
}

const MODEL_FILES: &[ModelFile] = &[
    ModelFile {
        remote_path: "onnx/vision_model.onnx",
        local_name: VISION_MODEL_FILENAME,
        label: "vision encoder",
    },
    ModelFile {
        remote_path: "onnx/text_model.onnx",
        local_name: TEXT_MODEL_FILENAME,
        label: "text encoder",
    },
    ModelFile {
        remote_path: "tokenizer.json",
        local_name: TOKENIZER_FILENAME,
        label: "tokenizer",
    },
];

fn download_url(repo: &str, remote_path: &str) -> String {
    format!("https://huggingface.co/{repo}/resolve/main/{remote_path}")
}

/// Execute the models command.
pub async fn execute(args: ModelsArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let model_path = config.model_path();

    match args.command {
        ModelsCommand::Download { force } => {
            let client = reqwest::Client::new();
            tokio::fs::create_dir_all(&model_path)
                .await
                .with_context(|| format!("Failed to create {}", model_path.display()))?;

            for file in MODEL_FILES {
                let dest = model_path.join(file.local_name);
                if dest.exists() && !force {
                    tracing::info!("{} already exists at {:?}", file.label, dest);
                    continue;
                }

                let url = download_url(&config.model.repo, file.remote_path);
                tracing::info!("Downloading {}...", file.label);
                tracing::info!("  Source: {}", url);
                tracing::info!("  Destination: {:?}", dest);
                download_file(&client, &url, &dest).await?;
            }

            tracing::info!("All downloads complete.");
        }

        ModelsCommand::List => {
            println!("Model: {} ({})", config.model.name, config.model.repo);
            println!("  Directory: {}\n", model_path.display());
            for (name, installed) in file_status(&model_path) {
                let status = if installed { "ready" } else { "not installed" };
                println!("    - {:24} {}", name, status);
            }
            if !ClipScorer::model_exists(&model_path) {
                println!("\nRun `attire models download` to fetch missing files.");
            }
        }

        ModelsCommand::Path => {
            println!("{}", model_path.display());
        }
    }

    Ok(())
}

/// Each required file and whether it is on disk.
fn file_status(model_path: &Path) -> Vec<(&'static str, bool)> {
    MODEL_FILES
        .iter()
        .map(|f| (f.local_name, model_path.join(f.local_name).exists()))
        .collect()
}

/// Stream a URL to `dest` through a `.part` file, with a progress bar.
///
/// The final path only appears once the download has completed.
async fn download_file(client: &reqwest::Client, url: &str, dest: &Path) -> anyhow::Result<()> {
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    let response = client
        .get(url)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| anyhow::anyhow!("Download failed: {e}"))?;

    let progress = match response.content_length() {
        Some(total) => {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("  [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")?
                    .progress_chars("=> "),
            );
            bar
        }
        None => ProgressBar::new_spinner(),
    };

    let partial = partial_path(dest);
    let mut file = tokio::fs::File::create(&partial).await?;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        progress.inc(chunk.len() as u64);
    }
    file.flush().await?;
    drop(file);
    progress.finish_and_clear();

    tokio::fs::rename(&partial, dest).await?;
    let size = tokio::fs::metadata(dest).await?.len();
    tracing::info!("  Complete ({:.1} MB)", size as f64 / (1024.0 * 1024.0));
    Ok(())
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_url() {
        assert_eq!(
            download_url("Xenova/clip-vit-base-patch32", "onnx/vision_model.onnx"),
            "https://huggingface.co/Xenova/clip-vit-base-patch32/resolve/main/onnx/vision_model.onnx"
        );
    }

    #[test]
    fn test_local_names_match_scorer_expectations() {
        let dir = tempfile::tempdir().unwrap();
        for file in MODEL_FILES {
            std::fs::write(dir.path().join(file.local_name), b"x").unwrap();
        }
        assert!(ClipScorer::model_exists(dir.path()));
    }

    #[test]
    fn test_file_status() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(TOKENIZER_FILENAME), b"{}").unwrap();
        let status = file_status(dir.path());
        assert_eq!(status.len(), 3);
        assert!(status.contains(&(TOKENIZER_FILENAME, true)));
        assert!(status.contains(&(VISION_MODEL_FILENAME, false)));
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/models/clip/text_model.onnx")),
            PathBuf::from("/models/clip/text_model.onnx.part")
        );
    }
}
