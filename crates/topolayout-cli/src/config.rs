//! CLI configuration management.
//!
//! Precedence, lowest first: built-in defaults, the config file, then
//! environment variables (a `.env` file in the working directory counts as
//! environment).

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use topolayout_core::{LogicalForceConfig, PhysicalForceConfig};

/// Application-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Frames to run when `--frames` is not given.
    pub frames: usize,

    /// How long to wait for one pass before moving on to the next frame.
    pub frame_timeout_ms: u64,

    /// Coefficients for physical topologies.
    pub physical: PhysicalForceConfig,

    /// Coefficients for logical topologies.
    pub logical: LogicalForceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frames: 60,
            frame_timeout_ms: 1000,
            physical: PhysicalForceConfig::default(),
            logical: LogicalForceConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the config file and environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present (silently ignore if missing)
        let _ = dotenvy::dotenv();

        let mut config = Self::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path).with_context(|| {
                    format!("Failed to read config from {}", config_path.display())
                })?;
                config = serde_json::from_str(&contents).with_context(|| {
                    format!("Failed to parse config file {}", config_path.display())
                })?;
            }
        }

        if let Some(frames) = env_override("TL_FRAMES")? {
            config.frames = frames;
        }
        if let Some(timeout) = env_override("TL_FRAME_TIMEOUT_MS")? {
            config.frame_timeout_ms = timeout;
        }
        if let Some(seed) = env_override::<u64>("TL_SEED")? {
            config.physical.seed = Some(seed);
            config.logical.seed = Some(seed);
        }
        if let Some(iterations) = env_override::<u32>("TL_MAX_ITERATIONS")? {
            config.physical.budget.max_iterations = iterations;
            config.logical.budget.max_iterations = iterations;
        }
        if let Some(limit) = env_override::<u64>("TL_TIME_LIMIT_MS")? {
            config.physical.budget.time_limit_ms = limit;
            config.logical.budget.time_limit_ms = limit;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check both force configurations.
    pub fn validate(&self) -> Result<()> {
        self.physical
            .validate()
            .context("Invalid physical layout configuration")?;
        self.logical
            .validate()
            .context("Invalid logical layout configuration")?;
        Ok(())
    }

    /// Save current configuration to the config file.
    pub fn save(&self) -> Result<PathBuf> {
        let config_path =
            Self::config_file_path().context("No configuration directory available")?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config to {}", config_path.display()))?;
        Ok(config_path)
    }

    /// Get the path to the config file. `TL_CONFIG` overrides the platform
    /// default.
    pub fn config_file_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("TL_CONFIG") {
            return Some(PathBuf::from(path));
        }
        ProjectDirs::from("dev", "topolayout", "tl")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Apply a `--seed` given on the command line to both simulations.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        if seed.is_some() {
            self.physical.seed = seed;
            self.logical.seed = seed;
        }
        self
    }
}

/// Parse an environment variable when it is set.
fn env_override<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("Invalid value for {name}: {value:?}")),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = serde_json::from_str(r#"{ "frames": 5, "physical": { "velocity_decay": 0.5 } }"#).unwrap();
        assert_eq!(config.frames, 5);
        assert_eq!(config.frame_timeout_ms, 1000);
        assert_eq!(config.physical.velocity_decay, 0.5);
        assert_eq!(config.physical.world_scale, 50.0);
        assert_eq!(config.logical, LogicalForceConfig::default());
    }

    #[test]
    fn test_seed_applies_to_both() {
        let config = Config::default().with_seed(Some(7));
        assert_eq!(config.physical.seed, Some(7));
        assert_eq!(config.logical.seed, Some(7));

        let config = Config::default().with_seed(None);
        assert_eq!(config.physical.seed, None);
    }
}
