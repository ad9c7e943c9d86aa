//! Configuration for the graupel loader.

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::error::{
    ConfigError, EmptyLoadPathSnafu, EmptyTargetLocationSnafu, ReadFileSnafu, YamlParseSnafu,
};
use crate::source::ListingConfig;

/// Configuration for the input source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Directory to scan for NDJSON event files.
    pub load_path: String,
    /// Listing behavior (extension filter, recursion).
    #[serde(flatten)]
    pub listing: ListingConfig,
}

/// Configuration for the target table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Root directory of the destination raw table.
    pub target_location: String,
}

/// Main configuration for graupel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source configuration.
    pub source: SourceConfig,
    /// Sink configuration.
    pub sink: SinkConfig,
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents).context(YamlParseSnafu)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration. Fails before any I/O.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(!self.source.load_path.is_empty(), EmptyLoadPathSnafu);
        ensure!(
            !self.sink.target_location.is_empty(),
            EmptyTargetLocationSnafu
        );
        Ok(())
    }
}
