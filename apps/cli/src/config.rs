//! CLI configuration
//!
//! Layered sources, later ones winning: built-in defaults, an optional
//! `testify.{toml,yaml,json}` in the working directory (or an explicit
//! `--config` file, which must exist), then `TESTIFY__SECTION__KEY`
//! environment variables. A `.env` file is loaded into the environment first.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const ROTATIONS: [&str; 4] = ["daily", "hourly", "minutely", "never"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub logging: LoggingConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level for the testify crates when `RUST_LOG` is unset
    pub level: String,
    pub json: bool,
    pub file_enabled: bool,
    pub file_directory: String,
    pub file_prefix: String,
    /// daily, hourly, minutely or never
    pub file_rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
            file_enabled: false,
            file_directory: "logs".to_string(),
            file_prefix: "testify".to_string(),
            file_rotation: "daily".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Table,
            color: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Table,
    Json,
}

impl CliConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        // Missing .env is the common case
        let _ = dotenvy::dotenv();

        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("testify").required(false),
        };

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("TESTIFY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<(), String> {
        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(format!(
                "logging.level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.logging.level
            ));
        }

        if self.logging.file_enabled {
            if !ROTATIONS.contains(&self.logging.file_rotation.as_str()) {
                return Err(format!(
                    "logging.file_rotation must be one of {}, got '{}'",
                    ROTATIONS.join(", "),
                    self.logging.file_rotation
                ));
            }
            if self.logging.file_prefix.trim().is_empty() {
                return Err("logging.file_prefix cannot be empty".to_string());
            }
            if self.logging.file_directory.trim().is_empty() {
                return Err("logging.file_directory cannot be empty".to_string());
            }
        }

        Ok(())
    }
}
