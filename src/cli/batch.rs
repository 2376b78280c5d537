use anyhow::{Context, Result};
use chrono::Local;
use console::{style, Emoji};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use super::generate::cancel_on_ctrl_c;
use super::{effective_config, Overrides};
use crate::logging::log_performance;
use crate::models::image::InputImage;
use crate::services::image_gen::{GenerationError, GenerationRequest, ImageGenerator};

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "[OK]");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "[X]");
static SKIP: Emoji<'_, '_> = Emoji("⏭ ", "[-]");

/// Result of one batch item
#[derive(Debug)]
pub enum BatchOutcome {
    Saved(PathBuf),
    Cancelled,
    Failed(String),
}

/// Output file name for the `index`th input, e.g. `me-20260101-120000-0.png`
pub fn output_name(input: &Path, stamp: &str, index: usize) -> String {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("image");
    format!("{stem}-{stamp}-{index}.png")
}

/// Handle the batch command.
///
/// All items are submitted at once; the generator's limiter decides how many
/// reach the proxy at the same time.
pub async fn handle_batch_command(
    overrides: &Overrides,
    prompt: String,
    images: Vec<PathBuf>,
    output_dir: PathBuf,
) -> Result<()> {
    let config = effective_config(overrides)?.to_generator_config()?;
    let generator = ImageGenerator::new(config.clone())?;

    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());
    close_on_cancel(&generator, cancel.clone());

    println!(
        "{} {} {} {}",
        style("Transforming").bold(),
        style(images.len()).cyan(),
        style("images, at most").dim(),
        style(format!("{} at a time", config.max_concurrent)).dim()
    );

    let pb = ProgressBar::new(images.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} images ({percent}%)")?
            .progress_chars("━━╸"),
    );

    let started = Instant::now();
    let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
    let tasks = images.iter().enumerate().map(|(index, input)| {
        let generator = generator.clone();
        let request_base = GenerationRequest::new(config.model.clone(), prompt.clone())
            .with_cancellation(cancel.clone());
        let target = output_dir.join(output_name(input, &stamp, index));
        let pb = pb.clone();
        async move {
            let outcome = run_item(&generator, request_base, input, &target).await;
            pb.inc(1);
            (input.clone(), outcome)
        }
    });

    let results = join_all(tasks).await;
    pb.finish_and_clear();

    let mut failures = 0usize;
    for (input, outcome) in &results {
        match outcome {
            BatchOutcome::Saved(path) => println!(
                "{}{} {} {}",
                CHECK,
                input.display(),
                style("→").dim(),
                path.display()
            ),
            BatchOutcome::Cancelled => {
                println!("{}{} {}", SKIP, input.display(), style("cancelled").yellow())
            }
            BatchOutcome::Failed(message) => {
                failures += 1;
                println!("{}{} {}", CROSS, input.display(), style(message).red())
            }
        }
    }

    log_performance(
        "batch",
        started.elapsed().as_millis() as u64,
        failures == 0,
    );

    if failures > 0 {
        anyhow::bail!("{failures} of {} images failed", results.len());
    }
    Ok(())
}

/// Stop the limiter once the batch is cancelled so queued items give up
/// their place instead of waiting for a slot.
fn close_on_cancel(generator: &ImageGenerator, cancel: CancellationToken) {
    let limiter = generator.limiter().clone();
    tokio::spawn(async move {
        cancel.cancelled().await;
        limiter.close();
        tracing::debug!("Batch cancelled, limiter closed");
    });
}

async fn run_item(
    generator: &ImageGenerator,
    request: GenerationRequest,
    input: &Path,
    target: &Path,
) -> BatchOutcome {
    let image = match InputImage::from_path(input) {
        Ok(image) => image,
        Err(e) => return BatchOutcome::Failed(e.user_message()),
    };

    match generator.generate(request.with_image(image)).await {
        Ok(Some(generated)) => match generated.write_to(target) {
            Ok(()) => BatchOutcome::Saved(target.to_path_buf()),
            Err(e) => BatchOutcome::Failed(e.user_message()),
        },
        Ok(None) | Err(GenerationError::LimiterClosed) => BatchOutcome::Cancelled,
        Err(e) => BatchOutcome::Failed(describe(&e)),
    }
}

fn describe(error: &GenerationError) -> String {
    if error.is_retryable() {
        format!("{} (gave up after retries)", error.user_message())
    } else {
        error.user_message()
    }
}
