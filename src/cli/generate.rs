use anyhow::{Context, Result};
use console::style;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use super::{effective_config, Overrides};
use crate::models::image::InputImage;
use crate::services::image_gen::{GenerationRequest, ImageGenerator};

/// Cancel `token` when the user presses Ctrl-C
pub fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling");
            token.cancel();
        }
    });
}

/// Handle the generate command
pub async fn handle_generate_command(
    overrides: &Overrides,
    prompt: String,
    image: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = effective_config(overrides)?.to_generator_config()?;
    let generator = ImageGenerator::new(config.clone())?;

    let mut request = GenerationRequest::new(config.model.clone(), prompt);
    if let Some(path) = &image {
        let input = InputImage::from_path(path)
            .with_context(|| format!("Failed to read input image {}", path.display()))?;
        request = request.with_image(input);
    }

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());
    request = request.with_cancellation(cancel);

    println!(
        "{} {}",
        style("Generating with").dim(),
        style(&config.model).cyan()
    );

    let generated = match generator.generate(request).await {
        Ok(Some(generated)) => generated,
        Ok(None) => {
            println!("{}", style("Generation cancelled.").yellow());
            return Ok(());
        }
        Err(e) => {
            eprintln!("{} {}", style("Generation failed:").red().bold(), e.user_message());
            return Err(e.into());
        }
    };

    match output {
        Some(path) => {
            generated
                .write_to(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{} {}", style("✓ Saved").green(), path.display());
        }
        None => println!("{}", generated.data_uri()),
    }

    Ok(())
}
