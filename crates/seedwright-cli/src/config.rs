use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use seedwright_generate::GenerateOptions;
use seedwright_plan::{CountConfig, Fingerprint, UserModels};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Contents of `seedwright.toml`. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeedwrightConfig {
    pub run: RunSection,
    pub models: UserModels,
    pub fingerprint: Fingerprint,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSection {
    pub seed: Option<String>,
    pub max_unique_attempts: Option<u32>,
    pub default_child_count: Option<CountConfig>,
}

impl SeedwrightConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::parse(&fs::read_to_string(path)?)
    }

    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Run options from the file, with command line values taking precedence.
    pub fn generate_options(&self, seed: Option<String>, max_unique_attempts: Option<u32>) -> GenerateOptions {
        let defaults = GenerateOptions::default();
        GenerateOptions {
            seed: seed
                .or_else(|| self.run.seed.clone())
                .unwrap_or(defaults.seed),
            max_unique_attempts: max_unique_attempts
                .or(self.run.max_unique_attempts)
                .unwrap_or(defaults.max_unique_attempts),
            default_child_count: self
                .run
                .default_child_count
                .unwrap_or(defaults.default_child_count),
        }
    }
}
