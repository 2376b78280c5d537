use anyhow::Result;
use console::{style, Emoji};

use super::{effective_config, Overrides};
use crate::config::Config;

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "[OK]");
static INFO: Emoji<'_, '_> = Emoji("ℹ ", "[i]");

/// Print the effective configuration (file, then environment, then flags)
pub fn handle_show_command(overrides: &Overrides) -> Result<()> {
    let config = effective_config(overrides)?;
    let path = Config::get_config_path()?;

    let source = if path.exists() {
        path.display().to_string()
    } else {
        "defaults (no config file)".to_string()
    };
    println!("{} {}", style("Source:").bold(), style(source).dim());
    println!();
    println!("{}", toml::to_string_pretty(&config)?);

    if let Err(e) = config.to_generator_config() {
        println!("{} {}", style("Invalid:").red().bold(), e.user_message());
    }
    Ok(())
}

/// Write a default config file unless one already exists
pub fn handle_init_command(force: bool) -> Result<()> {
    let path = Config::get_config_path()?;
    if path.exists() && !force {
        println!(
            "{}{} {}",
            INFO,
            style("Config already exists at").dim(),
            path.display()
        );
        println!("  Use {} to overwrite it", style("genbooth config init --force").cyan());
        return Ok(());
    }

    let path = Config::default().save()?;
    println!("{}{} {}", CHECK, style("Wrote").green(), path.display());
    Ok(())
}

pub fn handle_path_command() -> Result<()> {
    println!("{}", Config::get_config_path()?.display());
    Ok(())
}
