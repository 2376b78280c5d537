pub mod batch;
pub mod generate;
pub mod setup;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::runtime::Runtime;

#[derive(Parser)]
#[command(name = "genbooth")]
#[command(about = "Image transformation booth generation client")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Override the generation proxy endpoint
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Override the model identifier
    #[arg(long, global = true)]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate one image from a prompt and an optional input photo
    Generate {
        /// Prompt describing the transformation
        #[arg(short, long)]
        prompt: String,
        /// Input image to transform
        #[arg(short, long)]
        image: Option<PathBuf>,
        /// Where to write the PNG (prints the data URI when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Apply one prompt to many input photos
    Batch {
        /// Prompt describing the transformation
        #[arg(short, long)]
        prompt: String,
        /// Directory for generated images
        #[arg(short, long, default_value = "genbooth-output")]
        output_dir: PathBuf,
        /// Input images
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Print the configuration file path
    Path,
}

/// Overrides given on the command line, applied after file and environment values
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub model: Option<String>,
}

impl Overrides {
    pub fn apply(&self, config: &mut crate::config::Config) {
        if let Some(endpoint) = &self.endpoint {
            config.generation.endpoint = endpoint.clone();
        }
        if let Some(model) = &self.model {
            config.generation.model = model.clone();
        }
    }
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        let rt = Runtime::new()?;
        let overrides = Overrides {
            endpoint: self.endpoint,
            model: self.model,
        };

        rt.block_on(async {
            match self.command {
                Commands::Generate {
                    prompt,
                    image,
                    output,
                } => generate::handle_generate_command(&overrides, prompt, image, output).await,
                Commands::Batch {
                    prompt,
                    output_dir,
                    images,
                } => batch::handle_batch_command(&overrides, prompt, images, output_dir).await,
                Commands::Config { command } => match command {
                    ConfigCommands::Show => setup::handle_show_command(&overrides),
                    ConfigCommands::Init { force } => setup::handle_init_command(force),
                    ConfigCommands::Path => setup::handle_path_command(),
                },
            }
        })
    }
}

/// Load file + environment configuration and apply command line overrides
pub fn effective_config(overrides: &Overrides) -> anyhow::Result<crate::config::Config> {
    let mut config = crate::config::load_effective()?;
    overrides.apply(&mut config);
    Ok(config)
}
