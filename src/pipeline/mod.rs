//! The load run: DISCOVER → PARTITION → MATERIALIZE → APPEND.
//!
//! One invocation is one pass; incremental growth comes from repeated
//! invocations, made safe by basename tracking in the table manifest.
//! Within a run, files are parsed in parallel on blocking tasks, but
//! nothing is committed until every file of the run has parsed — a
//! single file failing aborts the run with zero rows appended.

use std::path::PathBuf;

use chrono::{DateTime, TimeZone, Utc};
use snafu::prelude::*;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{PipelineError, TaskJoinSnafu};
use crate::row::RawRow;
use crate::source::{DiscoveredFile, ListingConfig, list_event_files, read_event_file};
use crate::table::{LoadedFile, TableStore};

/// Parameters for one load run.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Directory to scan for event files.
    pub load_path: PathBuf,
    /// Root of the destination raw table.
    pub target_location: PathBuf,
    /// Listing behavior.
    pub listing: ListingConfig,
    /// Run timestamp override. `None` uses the wall clock at run start.
    /// Threaded as an immutable value into every task; there is no
    /// shared clock state.
    pub load_at: Option<DateTime<Utc>>,
}

impl LoadRequest {
    /// Build a request from a validated configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            load_path: PathBuf::from(&config.source.load_path),
            target_location: PathBuf::from(&config.sink.target_location),
            listing: config.source.listing.clone(),
            load_at: None,
        }
    }
}

/// Outcome of one load run.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    /// Rows appended to the table.
    pub rows_appended: usize,
    /// Basenames ingested this run, in listing order.
    pub files_loaded: Vec<String>,
    /// Candidates skipped because they were already loaded.
    pub files_skipped: usize,
    /// The run's shared load timestamp; `None` for a no-op run.
    pub load_at: Option<DateTime<Utc>>,
}

impl LoadSummary {
    fn no_op(files_skipped: usize) -> Self {
        Self {
            rows_appended: 0,
            files_loaded: Vec::new(),
            files_skipped,
            load_at: None,
        }
    }

    /// Whether the run appended anything.
    pub fn is_no_op(&self) -> bool {
        self.load_at.is_none()
    }
}

/// Execute one load run against the target table.
///
/// Safe to invoke repeatedly against a growing directory: files whose
/// basename is already in the table are excluded, a run with no new
/// files mutates nothing (and consumes no `load_at`), and a failed run
/// leaves the table exactly as it was.
pub async fn run_load(request: &LoadRequest) -> Result<LoadSummary, PipelineError> {
    // DISCOVER
    let candidates = list_event_files(&request.load_path, &request.listing)?;
    debug!(
        load_path = %request.load_path.display(),
        candidates = candidates.len(),
        "Discovered candidate files"
    );

    // PARTITION
    let store = TableStore::new(&request.target_location);
    let manifest = store.load_manifest()?;
    let (new_files, already_loaded) = manifest.partition_candidates(candidates);

    if new_files.is_empty() {
        info!(
            table = %request.target_location.display(),
            skipped = already_loaded.len(),
            "No new files to load"
        );
        return Ok(LoadSummary::no_op(already_loaded.len()));
    }

    // One timestamp per run, fixed before any file is touched.
    let load_at = truncate_to_micros(request.load_at.unwrap_or_else(Utc::now));

    // MATERIALIZE
    let (rows, loaded_files) = materialize(&new_files, load_at).await?;

    // APPEND
    let file_names: Vec<String> = loaded_files
        .iter()
        .map(|file| file.filename.clone())
        .collect();
    let segment = store.commit(&rows, loaded_files, load_at)?;

    info!(
        table = %request.target_location.display(),
        segment = %segment.id,
        rows = segment.rows,
        files = file_names.len(),
        skipped = already_loaded.len(),
        "Load run committed"
    );

    Ok(LoadSummary {
        rows_appended: segment.rows,
        files_loaded: file_names,
        files_skipped: already_loaded.len(),
        load_at: Some(load_at),
    })
}

/// Parse every new file and stamp its rows with the run's `load_at`.
///
/// Files parse concurrently on blocking tasks; the commit is gated on
/// all of them, so a partial set of successes never reaches the table.
async fn materialize(
    new_files: &[DiscoveredFile],
    load_at: DateTime<Utc>,
) -> Result<(Vec<RawRow>, Vec<LoadedFile>), PipelineError> {
    let tasks: Vec<_> = new_files
        .iter()
        .map(|file| {
            let path = file.path.clone();
            let basename = file.basename.clone();
            tokio::task::spawn_blocking(move || {
                read_event_file(&path).map(|events| (basename, events))
            })
        })
        .collect();

    let joined = futures::future::try_join_all(tasks)
        .await
        .context(TaskJoinSnafu)?;

    let mut rows = Vec::new();
    let mut loaded_files = Vec::with_capacity(new_files.len());
    for result in joined {
        let (basename, events) = result?;
        loaded_files.push(LoadedFile {
            filename: basename.clone(),
            rows: events.len(),
        });
        rows.extend(
            events
                .into_iter()
                .map(|event| RawRow::new(event, load_at, basename.clone())),
        );
    }

    Ok((rows, loaded_files))
}

/// Truncate to microsecond precision so the stored value round-trips
/// identically through the segment files and the manifest.
fn truncate_to_micros(ts: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_micros(ts.timestamp_micros())
        .single()
        .unwrap_or(ts)
}
