//! Directory-backed raw table with atomic, append-only commits.
//!
//! ## Directory Structure
//!
//! ```text
//! target_location/
//! ├── _graupel/
//! │   └── manifest.json        # commit point (segments + load state)
//! ├── _staging/                # in-flight segments, invisible
//! └── data/
//!     └── {unix_micros}-{uuid}.ndjson
//! ```
//!
//! ## Commit Protocol
//!
//! 1. Write the run's rows to `_staging/{segment}.ndjson`
//! 2. Rename the staged file into `data/{segment}.ndjson`
//! 3. Atomically rewrite the manifest (temp file + rename)
//!
//! The manifest is the single point of visibility: readers only look
//! at segments it lists, so a crash after step 1 or 2 leaves the table
//! exactly as it was before the run. Orphaned staging files from a
//! crashed run are swept on the next successful commit.

pub mod manifest;

pub use manifest::{LoadedFile, SegmentMeta, TableManifest};

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use snafu::prelude::*;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{
    CreateDirSnafu, ManifestParseSnafu, ManifestSerializeSnafu, ManifestWriteSnafu,
    PersistSegmentSnafu, SegmentParseSnafu, SegmentReadSnafu, SerializeRowSnafu, StorageError,
    WriteSegmentSnafu,
};
use crate::row::RawRow;

/// Directory holding the manifest, under the table root.
pub const MANIFEST_DIR: &str = "_graupel";

/// Directory for in-flight (invisible) segment files.
pub const STAGING_DIR: &str = "_staging";

/// Directory for committed segment files.
pub const DATA_DIR: &str = "data";

const MANIFEST_FILE: &str = "manifest.json";

/// Handle to a raw table rooted at `target_location`.
///
/// Append-only: commits add segments and never rewrite or delete
/// previously committed rows. Creation-on-first-append is handled
/// here; a no-op run against a missing table creates nothing.
pub struct TableStore {
    root: PathBuf,
}

impl TableStore {
    /// Open a handle to the table at the given root. No I/O happens
    /// until the first read or commit.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Table root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the table has been bootstrapped (manifest present).
    pub fn exists(&self) -> bool {
        self.manifest_path().is_file()
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_DIR).join(MANIFEST_FILE)
    }

    /// Load the current manifest.
    ///
    /// A missing table or manifest reads as the empty manifest rather
    /// than an error — the bootstrap case for the very first run.
    pub fn load_manifest(&self) -> Result<TableManifest, StorageError> {
        let path = self.manifest_path();
        let display = path.display().to_string();

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(table = %self.root.display(), "No manifest found, table is empty");
                return Ok(TableManifest::default());
            }
            Err(source) => {
                return Err(StorageError::ManifestRead {
                    path: display,
                    source,
                });
            }
        };

        serde_json::from_str(&contents).context(ManifestParseSnafu { path: &display })
    }

    /// Append one run's rows as a single atomic segment.
    ///
    /// All rows become visible together once the manifest rename lands;
    /// until then the table state is untouched. The caller guarantees
    /// every row carries the run's shared `load_at`.
    pub fn commit(
        &self,
        rows: &[RawRow],
        files: Vec<LoadedFile>,
        load_at: DateTime<Utc>,
    ) -> Result<SegmentMeta, StorageError> {
        let segment_id = format!("{}-{}.ndjson", load_at.timestamp_micros(), Uuid::new_v4());

        let staging_dir = self.root.join(STAGING_DIR);
        let data_dir = self.root.join(DATA_DIR);
        let manifest_dir = self.root.join(MANIFEST_DIR);
        for dir in [&staging_dir, &data_dir, &manifest_dir] {
            fs::create_dir_all(dir).context(CreateDirSnafu {
                path: dir.display().to_string(),
            })?;
        }

        // Stage the segment where readers cannot see it.
        let staged_path = staging_dir.join(&segment_id);
        self.write_segment(&staged_path, rows)?;

        // Move into the data directory. Still invisible: the manifest
        // does not list it yet.
        let data_path = data_dir.join(&segment_id);
        fs::rename(&staged_path, &data_path).context(PersistSegmentSnafu {
            path: data_path.display().to_string(),
        })?;

        // Manifest rename is the commit point.
        let mut manifest = self.load_manifest()?;
        let segment = SegmentMeta {
            id: segment_id,
            load_at,
            rows: rows.len(),
            files,
        };
        manifest.record_segment(segment.clone());
        self.write_manifest(&manifest)?;

        self.sweep_staging(&staging_dir);

        info!(
            table = %self.root.display(),
            segment = %segment.id,
            rows = segment.rows,
            files = segment.files.len(),
            "Committed segment"
        );

        Ok(segment)
    }

    fn write_segment(&self, path: &Path, rows: &[RawRow]) -> Result<(), StorageError> {
        let display = path.display().to_string();
        let file = File::create(path).context(WriteSegmentSnafu { path: &display })?;
        let mut writer = BufWriter::new(file);

        for row in rows {
            let line = serde_json::to_string(row).context(SerializeRowSnafu { path: &display })?;
            writer
                .write_all(line.as_bytes())
                .context(WriteSegmentSnafu { path: &display })?;
            writer
                .write_all(b"\n")
                .context(WriteSegmentSnafu { path: &display })?;
        }

        writer.flush().context(WriteSegmentSnafu { path: &display })?;
        writer
            .into_inner()
            .map_err(|e| e.into_error())
            .and_then(|file| file.sync_all())
            .context(WriteSegmentSnafu { path: &display })?;

        Ok(())
    }

    fn write_manifest(&self, manifest: &TableManifest) -> Result<(), StorageError> {
        let path = self.manifest_path();
        let display = path.display().to_string();

        let json = serde_json::to_string_pretty(manifest).context(ManifestSerializeSnafu)?;

        // Temp file + rename so the manifest is never partially visible.
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json.as_bytes()).context(ManifestWriteSnafu {
            path: tmp_path.display().to_string(),
        })?;
        fs::rename(&tmp_path, &path).context(ManifestWriteSnafu { path: &display })?;

        debug!(path = %path.display(), segments = manifest.segments.len(), "Saved manifest");
        Ok(())
    }

    /// Remove leftover staging files from crashed runs. Best-effort:
    /// orphans are invisible anyway.
    fn sweep_staging(&self, staging_dir: &Path) {
        let Ok(entries) = fs::read_dir(staging_dir) else {
            return;
        };
        for entry in entries.flatten() {
            if let Err(e) = fs::remove_file(entry.path()) {
                warn!(path = %entry.path().display(), error = %e, "Failed to sweep staging file");
            }
        }
    }

    /// Read back every committed row, in manifest (commit) order.
    ///
    /// A missing table reads as empty.
    pub fn scan(&self) -> Result<Vec<RawRow>, StorageError> {
        let manifest = self.load_manifest()?;
        let data_dir = self.root.join(DATA_DIR);

        let mut rows = Vec::with_capacity(manifest.total_rows());
        for segment in &manifest.segments {
            let path = data_dir.join(&segment.id);
            let display = path.display().to_string();
            let file = File::open(&path).context(SegmentReadSnafu { path: &display })?;

            for (index, line_result) in BufReader::new(file).lines().enumerate() {
                let line = line_result.context(SegmentReadSnafu { path: &display })?;
                if line.is_empty() {
                    continue;
                }
                let row: RawRow = serde_json::from_str(&line).context(SegmentParseSnafu {
                    path: &display,
                    line: index + 1,
                })?;
                rows.push(row);
            }
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::TempDir;

    fn ts(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 25, 12, 0, secs).unwrap()
    }

    fn rows_for(filename: &str, count: usize, load_at: DateTime<Utc>) -> Vec<RawRow> {
        (0..count)
            .map(|i| {
                let mut event = serde_json::Map::new();
                event.insert("event_type".to_string(), json!("play"));
                event.insert("seq".to_string(), json!(i));
                RawRow::new(event, load_at, filename.to_string())
            })
            .collect()
    }

    #[test]
    fn test_missing_table_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = TableStore::new(temp_dir.path().join("table"));

        assert!(!store.exists());
        assert_eq!(store.load_manifest().unwrap(), TableManifest::default());
        assert!(store.scan().unwrap().is_empty());
    }

    #[test]
    fn test_commit_bootstraps_table() {
        let temp_dir = TempDir::new().unwrap();
        let store = TableStore::new(temp_dir.path().join("table"));

        let load_at = ts(0);
        let rows = rows_for("a.json", 3, load_at);
        let files = vec![LoadedFile {
            filename: "a.json".to_string(),
            rows: 3,
        }];
        let segment = store.commit(&rows, files, load_at).unwrap();

        assert!(store.exists());
        assert_eq!(segment.rows, 3);
        assert!(
            temp_dir
                .path()
                .join("table")
                .join(DATA_DIR)
                .join(&segment.id)
                .is_file()
        );

        let scanned = store.scan().unwrap();
        assert_eq!(scanned.len(), 3);
        assert!(scanned.iter().all(|row| row.load_at == load_at));
        assert!(scanned.iter().all(|row| row.filename == "a.json"));
    }

    #[test]
    fn test_commit_appends_without_touching_history() {
        let temp_dir = TempDir::new().unwrap();
        let store = TableStore::new(temp_dir.path());

        let first = store
            .commit(
                &rows_for("a.json", 2, ts(0)),
                vec![LoadedFile {
                    filename: "a.json".to_string(),
                    rows: 2,
                }],
                ts(0),
            )
            .unwrap();
        store
            .commit(
                &rows_for("b.json", 3, ts(1)),
                vec![LoadedFile {
                    filename: "b.json".to_string(),
                    rows: 3,
                }],
                ts(1),
            )
            .unwrap();

        let manifest = store.load_manifest().unwrap();
        assert_eq!(manifest.segments.len(), 2);
        assert_eq!(manifest.segments[0], first);
        assert_eq!(manifest.total_rows(), 5);

        let scanned = store.scan().unwrap();
        assert_eq!(scanned.len(), 5);
        assert_eq!(manifest.load_ats().len(), 2);
    }

    #[test]
    fn test_staged_rows_invisible_until_manifest_lists_them() {
        let temp_dir = TempDir::new().unwrap();
        let store = TableStore::new(temp_dir.path());

        store
            .commit(
                &rows_for("a.json", 2, ts(0)),
                vec![LoadedFile {
                    filename: "a.json".to_string(),
                    rows: 2,
                }],
                ts(0),
            )
            .unwrap();

        // Simulate a crash after a segment landed in data/ but before
        // the manifest rename: drop an unlisted segment file in.
        let orphan = temp_dir.path().join(DATA_DIR).join("999-orphan.ndjson");
        fs::write(&orphan, "{\"x\":1,\"load_at\":\"2026-08-25T12:00:00Z\",\"filename\":\"x\"}\n")
            .unwrap();

        let scanned = store.scan().unwrap();
        assert_eq!(scanned.len(), 2, "unlisted segments must stay invisible");
    }

    #[test]
    fn test_sweep_removes_stale_staging_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = TableStore::new(temp_dir.path());

        let staging_dir = temp_dir.path().join(STAGING_DIR);
        fs::create_dir_all(&staging_dir).unwrap();
        fs::write(staging_dir.join("stale.ndjson"), b"{}\n").unwrap();

        store
            .commit(
                &rows_for("a.json", 1, ts(0)),
                vec![LoadedFile {
                    filename: "a.json".to_string(),
                    rows: 1,
                }],
                ts(0),
            )
            .unwrap();

        let leftovers: Vec<_> = fs::read_dir(&staging_dir).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_scan_round_trips_event_fields() {
        let temp_dir = TempDir::new().unwrap();
        let store = TableStore::new(temp_dir.path());

        let load_at = ts(0);
        let mut event = serde_json::Map::new();
        event.insert("user_id".to_string(), json!("u42"));
        event.insert("nested".to_string(), json!({"a": [1, 2, 3]}));
        let rows = vec![RawRow::new(event, load_at, "a.json".to_string())];

        store
            .commit(
                &rows,
                vec![LoadedFile {
                    filename: "a.json".to_string(),
                    rows: 1,
                }],
                load_at,
            )
            .unwrap();

        let scanned = store.scan().unwrap();
        assert_eq!(scanned, rows);
    }
}
