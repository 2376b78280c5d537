//! Configuration file management for genbooth
//!
//! This module handles reading and writing configuration values to ~/.genbooth/config.toml
//! Configuration values can be overridden by environment variables.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::env::{generation as env_generation, retry as env_retry};
use crate::error::{GenboothError, Result};
use crate::services::image_gen::{GeneratorConfig, RetryConfig};

/// Configuration structure matching config.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub generation: GenerationSection,
    #[serde(default)]
    pub retry: RetrySection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationSection {
    pub endpoint: String,
    pub model: String,
    pub timeout_ms: u64,
    pub max_concurrent: usize,
}

impl Default for GenerationSection {
    fn default() -> Self {
        let defaults = GeneratorConfig::default();
        Self {
            endpoint: defaults.endpoint,
            model: defaults.model,
            timeout_ms: defaults.timeout.as_millis() as u64,
            max_concurrent: defaults.max_concurrent,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub rate_limit_penalty_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        let defaults = RetryConfig::default();
        Self {
            max_attempts: defaults.max_attempts,
            base_delay_ms: defaults.base_delay.as_millis() as u64,
            rate_limit_penalty_ms: defaults.rate_limit_penalty.as_millis() as u64,
        }
    }
}

impl Config {
    /// Get the config file path (~/.genbooth/config.toml)
    pub fn get_config_path() -> Result<PathBuf> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| GenboothError::invalid_config("Could not find home directory"))?;
        Ok(home_dir.join(".genbooth").join("config.toml"))
    }

    /// Load configuration from the default path.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::get_config_path()?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::get_config_path()?;
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// Apply environment variable overrides on top of file values
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(env_generation::ENDPOINT) {
            self.generation.endpoint = endpoint;
        }
        if let Some(model) = lookup(env_generation::MODEL) {
            self.generation.model = model;
        }
        override_number(&lookup, env_generation::TIMEOUT_MS, &mut self.generation.timeout_ms)?;
        override_number(
            &lookup,
            env_generation::CONCURRENT,
            &mut self.generation.max_concurrent,
        )?;
        override_number(&lookup, env_retry::MAX_ATTEMPTS, &mut self.retry.max_attempts)?;
        override_number(&lookup, env_retry::BASE_DELAY_MS, &mut self.retry.base_delay_ms)?;
        override_number(
            &lookup,
            env_retry::RATE_LIMIT_PENALTY_MS,
            &mut self.retry.rate_limit_penalty_ms,
        )?;
        Ok(())
    }

    /// Build the generator configuration, validating it on the way
    pub fn to_generator_config(&self) -> Result<GeneratorConfig> {
        let config = GeneratorConfig {
            endpoint: self.generation.endpoint.clone(),
            model: self.generation.model.clone(),
            timeout: Duration::from_millis(self.generation.timeout_ms),
            max_concurrent: self.generation.max_concurrent,
            retry: RetryConfig {
                max_attempts: self.retry.max_attempts,
                base_delay: Duration::from_millis(self.retry.base_delay_ms),
                rate_limit_penalty: Duration::from_millis(self.retry.rate_limit_penalty_ms),
            },
        };
        config
            .validate()
            .map_err(|e| GenboothError::invalid_config(e.to_string()))?;
        Ok(config)
    }
}

fn override_number<F, T>(lookup: &F, name: &str, target: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(name) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| GenboothError::validation(name, format!("not a number: {raw}")))?;
    }
    Ok(())
}

/// Load the config file and apply environment overrides
pub fn load_effective() -> Result<Config> {
    let mut config = Config::load()?;
    config.apply_env_overrides()?;
    Ok(config)
}
