//! Run loop: classify each discovered file and stream results out.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use attire_core::{ClassifiedImage, OutputWriter, ProcessingStats};
use indicatif::{ProgressBar, ProgressStyle};

use super::{ClassifyArgs, ClassifyContext};

/// Classify every file, writing one record per image that could be preprocessed.
///
/// Per-file failures are logged and counted; they never abort the run.
pub async fn run(
    ctx: ClassifyContext,
    args: &ClassifyArgs,
    files: Vec<PathBuf>,
) -> anyhow::Result<()> {
    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {:?}", path))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let mut writer: OutputWriter<_, ClassifiedImage> =
        OutputWriter::new(sink, ctx.output_format, ctx.pretty);

    let progress = if files.len() > 1 {
        create_progress_bar(files.len() as u64)
    } else {
        ProgressBar::hidden()
    };

    let mut stats = ProcessingStats::default();
    let start_time = Instant::now();

    for path in &files {
        match ctx.processor.process_with_options(path, &ctx.options).await {
            Ok(record) => {
                stats.succeeded += 1;
                stats.axis_failures += record.prediction.failed_axes();
                writer.push(record)?;
            }
            Err(e) => {
                stats.failed += 1;
                progress.suspend(|| tracing::warn!("Skipped {:?}: {}", path, e));
            }
        }

        progress.inc(1);
        let elapsed = start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let done = stats.succeeded + stats.failed;
            progress.set_message(format!("{:.1} img/sec", done as f64 / elapsed));
        }
    }

    progress.finish_and_clear();
    let written = writer.finish()?;
    stats.total_seconds = start_time.elapsed().as_secs_f64();

    if let Some(path) = &args.output {
        tracing::info!("{} record(s) written to {:?}", written, path);
    }
    tracing::info!(
        succeeded = stats.succeeded,
        failed = stats.failed,
        axis_failures = stats.axis_failures,
        "Classification finished"
    );
    if files.len() > 1 {
        print_summary(&stats);
    }

    Ok(())
}

fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_message("starting...");
    pb
}

fn summary_lines(stats: &ProcessingStats) -> Vec<String> {
    let mut lines = vec![
        "  ====================================".to_string(),
        "               Summary".to_string(),
        "  ====================================".to_string(),
        format!("    Classified:   {:>8}", stats.succeeded),
    ];
    if stats.failed > 0 {
        lines.push(format!("    Skipped:      {:>8}", stats.failed));
    }
    if stats.axis_failures > 0 {
        lines.push(format!("    Axis errors:  {:>8}", stats.axis_failures));
    }
    lines.push("  ------------------------------------".to_string());
    lines.push(format!(
        "    Total:        {:>8}",
        stats.succeeded + stats.failed
    ));
    lines.push(format!("    Duration:     {:>7.1}s", stats.total_seconds));
    lines.push(format!("    Rate:         {:>7.1} img/sec", stats.rate()));
    lines.push("  ====================================".to_string());
    lines
}

/// Summary table on stderr, so stdout stays pure JSON.
fn print_summary(stats: &ProcessingStats) {
    eprintln!();
    for line in summary_lines(stats) {
        eprintln!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_hides_zero_failures() {
        let stats = ProcessingStats {
            succeeded: 4,
            failed: 0,
            axis_failures: 0,
            total_seconds: 2.0,
        };
        let text = summary_lines(&stats).join("\n");
        assert!(text.contains("Classified:          4"));
        assert!(!text.contains("Skipped"));
        assert!(!text.contains("Axis errors"));
        assert!(text.contains("2.0 img/sec"));
    }

    #[test]
    fn test_summary_reports_failures() {
        let stats = ProcessingStats {
            succeeded: 3,
            failed: 1,
            axis_failures: 2,
            total_seconds: 1.0,
        };
        let text = summary_lines(&stats).join("\n");
        assert!(text.contains("Skipped:             1"));
        assert!(text.contains("Axis errors:         2"));
        assert!(text.contains("Total:               4"));
    }

    #[test]
    fn test_progress_bar_length() {
        let pb = create_progress_bar(7);
        assert_eq!(pb.length(), Some(7));
    }
}
