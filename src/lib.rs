//! Graupel: incremental NDJSON event loader for append-only raw tables.
//!
//! This crate handles:
//! - Discovering NDJSON event files in a load directory
//! - Excluding files already represented in the target table
//! - Parsing events and stamping rows with a run-scoped `load_at`
//!   timestamp and the source `filename`
//! - Appending each run as a single atomic segment, committed through
//!   a manifest rename so re-runs and crashes never duplicate or
//!   partially expose rows

pub mod config;
pub mod error;
pub mod pipeline;
pub mod row;
pub mod source;
pub mod table;
pub mod tracing;

// Re-export commonly used items
pub use crate::config::Config;
pub use crate::error::PipelineError;
pub use crate::pipeline::{LoadRequest, LoadSummary, run_load};
pub use crate::row::{FILENAME_COLUMN, LOAD_AT_COLUMN, RawRow};
pub use crate::table::{TableManifest, TableStore};
pub use crate::tracing::init_tracing;
