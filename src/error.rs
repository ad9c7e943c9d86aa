//! Error types for the graupel loader.
//!
//! Every error aborts the run wholesale: no partial commits, nothing
//! swallowed. Each variant carries enough context (file name, line
//! number, underlying I/O error) to diagnose and rerun.

use snafu::prelude::*;

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Load path is empty.
    #[snafu(display("Load path cannot be empty"))]
    EmptyLoadPath,

    /// Target location is empty.
    #[snafu(display("Target location cannot be empty"))]
    EmptyTargetLocation,

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML configuration"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file {path}"))]
    ReadFile {
        path: String,
        source: std::io::Error,
    },
}

/// Errors that can occur while listing candidate event files.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DiscoveryError {
    /// Load path does not exist.
    #[snafu(display("Load path does not exist: {path}"))]
    PathMissing { path: String },

    /// Load path is not a directory.
    #[snafu(display("Load path is not a directory: {path}"))]
    NotADirectory { path: String },

    /// Failed to read the load directory.
    #[snafu(display("Failed to read load directory {path}"))]
    ReadDir {
        path: String,
        source: std::io::Error,
    },

    /// Two candidate files share a basename. Basename is the identity
    /// key for deduplication, so the listing is ambiguous.
    #[snafu(display("Duplicate basename in load directory: {basename}"))]
    DuplicateBasename { basename: String },
}

/// Errors that can occur while parsing an NDJSON event file.
///
/// A malformed line rejects the whole file. Partial ingestion would
/// corrupt the append-only invariant, so there is no skip-and-continue
/// mode.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ParseError {
    /// Failed to open the event file.
    #[snafu(display("Failed to open event file {path}"))]
    Open {
        path: String,
        source: std::io::Error,
    },

    /// Failed to read a line from the event file.
    #[snafu(display("Failed to read {path} at line {line}"))]
    ReadLine {
        path: String,
        line: usize,
        source: std::io::Error,
    },

    /// A line is not valid JSON.
    #[snafu(display("Invalid JSON in {path} at line {line}: {source}"))]
    InvalidJson {
        path: String,
        line: usize,
        source: serde_json::Error,
    },

    /// A line is valid JSON but not an object.
    #[snafu(display("Expected a JSON object in {path} at line {line}"))]
    NotAnObject { path: String, line: usize },

    /// An event field collides with a reserved column name.
    #[snafu(display(
        "Event field collides with reserved column '{column}' in {path} at line {line}"
    ))]
    ReservedColumn {
        path: String,
        line: usize,
        column: String,
    },
}

/// Errors that can occur during table storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Failed to create a table directory.
    #[snafu(display("Failed to create table directory {path}"))]
    CreateDir {
        path: String,
        source: std::io::Error,
    },

    /// Failed to write a staged segment file.
    #[snafu(display("Failed to write staged segment {path}"))]
    WriteSegment {
        path: String,
        source: std::io::Error,
    },

    /// Failed to serialize a row to NDJSON.
    #[snafu(display("Failed to serialize row for segment {path}"))]
    SerializeRow {
        path: String,
        source: serde_json::Error,
    },

    /// Failed to move a staged segment into the data directory.
    #[snafu(display("Failed to persist segment {path}"))]
    PersistSegment {
        path: String,
        source: std::io::Error,
    },

    /// Failed to read the table manifest.
    #[snafu(display("Failed to read table manifest {path}"))]
    ManifestRead {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse the table manifest.
    #[snafu(display("Failed to parse table manifest {path}"))]
    ManifestParse {
        path: String,
        source: serde_json::Error,
    },

    /// Failed to serialize the table manifest.
    #[snafu(display("Failed to serialize table manifest"))]
    ManifestSerialize { source: serde_json::Error },

    /// Failed to write the table manifest.
    #[snafu(display("Failed to write table manifest {path}"))]
    ManifestWrite {
        path: String,
        source: std::io::Error,
    },

    /// Failed to read a committed segment file.
    #[snafu(display("Failed to read segment {path}"))]
    SegmentRead {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse a row from a committed segment file.
    #[snafu(display("Failed to parse row in segment {path} at line {line}"))]
    SegmentParse {
        path: String,
        line: usize,
        source: serde_json::Error,
    },
}

/// Top-level errors for a load run.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipelineError {
    /// Configuration error.
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    /// Discovery error.
    #[snafu(display("Discovery error: {source}"))]
    Discovery { source: DiscoveryError },

    /// Parse error.
    #[snafu(display("Parse error: {source}"))]
    Parse { source: ParseError },

    /// Storage error.
    #[snafu(display("Storage error: {source}"))]
    Storage { source: StorageError },

    /// Task join error.
    #[snafu(display("Task join error: {source}"))]
    TaskJoin { source: tokio::task::JoinError },
}

impl From<ConfigError> for PipelineError {
    fn from(source: ConfigError) -> Self {
        PipelineError::Config { source }
    }
}

impl From<DiscoveryError> for PipelineError {
    fn from(source: DiscoveryError) -> Self {
        PipelineError::Discovery { source }
    }
}

impl From<ParseError> for PipelineError {
    fn from(source: ParseError) -> Self {
        PipelineError::Parse { source }
    }
}

impl From<StorageError> for PipelineError {
    fn from(source: StorageError) -> Self {
        PipelineError::Storage { source }
    }
}
