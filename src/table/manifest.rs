//! Table manifest: the commit point and load-state record.
//!
//! The manifest is a JSON document at `{target}/_graupel/manifest.json`
//! listing every committed segment, the run timestamp that produced it,
//! and the source files it ingested. Rows become visible only once
//! their segment is listed here, and "already loaded" is answered from
//! the filenames recorded here.
//!
//! # Example
//!
//! ```json
//! {
//!   "schema_version": 1,
//!   "segments": [
//!     {
//!       "id": "1756123200000000-3f1c....ndjson",
//!       "load_at": "2026-08-25T12:00:00.000000Z",
//!       "rows": 42,
//!       "files": [{"filename": "event_logs_00.json", "rows": 42}]
//!     }
//!   ],
//!   "last_update_ts": 1756123200
//! }
//! ```

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::source::DiscoveredFile;

fn default_schema_version() -> u32 {
    1
}

/// One source file ingested by a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedFile {
    /// Basename of the source file (the identity key).
    pub filename: String,
    /// Number of rows the file contributed.
    pub rows: usize,
}

/// One committed segment: the output of a single load run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentMeta {
    /// Segment file name under `{target}/data/`.
    pub id: String,
    /// The run's shared load timestamp.
    pub load_at: DateTime<Utc>,
    /// Total rows in the segment.
    pub rows: usize,
    /// Source files ingested into the segment.
    pub files: Vec<LoadedFile>,
}

/// Persisted load state for a raw table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableManifest {
    /// Schema version for forward compatibility.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Committed segments, in commit order.
    #[serde(default)]
    pub segments: Vec<SegmentMeta>,
    /// Unix timestamp of the last manifest update.
    #[serde(default)]
    pub last_update_ts: i64,
}

impl Default for TableManifest {
    fn default() -> Self {
        Self {
            schema_version: 1,
            segments: Vec::new(),
            last_update_ts: 0,
        }
    }
}

impl TableManifest {
    /// Distinct basenames of every file ever committed.
    ///
    /// A file stays in this set even after it disappears from the load
    /// directory: basename is the identity key, so re-adding a file
    /// with the same name (and any content) never reloads it.
    pub fn loaded_filenames(&self) -> HashSet<&str> {
        self.segments
            .iter()
            .flat_map(|segment| segment.files.iter())
            .map(|file| file.filename.as_str())
            .collect()
    }

    /// Distinct `load_at` values across all committed segments.
    pub fn load_ats(&self) -> BTreeSet<DateTime<Utc>> {
        self.segments.iter().map(|segment| segment.load_at).collect()
    }

    /// Total committed row count.
    pub fn total_rows(&self) -> usize {
        self.segments.iter().map(|segment| segment.rows).sum()
    }

    /// Partition discovery candidates into (`new`, `already_loaded`).
    ///
    /// Pure function of manifest state and the listing; no mutation
    /// happens here. On a missing table this is called on the default
    /// (empty) manifest, so every candidate is `new` — the bootstrap
    /// case for the very first run.
    pub fn partition_candidates(
        &self,
        candidates: Vec<DiscoveredFile>,
    ) -> (Vec<DiscoveredFile>, Vec<DiscoveredFile>) {
        let loaded = self.loaded_filenames();
        candidates
            .into_iter()
            .partition(|candidate| !loaded.contains(candidate.basename.as_str()))
    }

    /// Record a committed segment and bump the update timestamp.
    pub fn record_segment(&mut self, segment: SegmentMeta) {
        self.segments.push(segment);
        self.last_update_ts = Utc::now().timestamp();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn segment(id: &str, load_at: DateTime<Utc>, files: &[(&str, usize)]) -> SegmentMeta {
        SegmentMeta {
            id: id.to_string(),
            load_at,
            rows: files.iter().map(|(_, rows)| rows).sum(),
            files: files
                .iter()
                .map(|(name, rows)| LoadedFile {
                    filename: name.to_string(),
                    rows: *rows,
                })
                .collect(),
        }
    }

    fn candidate(basename: &str) -> DiscoveredFile {
        DiscoveredFile {
            path: PathBuf::from(format!("/loading/{basename}")),
            basename: basename.to_string(),
        }
    }

    fn ts(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 25, 12, 0, secs).unwrap()
    }

    #[test]
    fn test_default_manifest_is_empty() {
        let manifest = TableManifest::default();
        assert_eq!(manifest.schema_version, 1);
        assert!(manifest.loaded_filenames().is_empty());
        assert!(manifest.load_ats().is_empty());
        assert_eq!(manifest.total_rows(), 0);
    }

    #[test]
    fn test_manifest_round_trip() {
        let mut manifest = TableManifest::default();
        manifest.record_segment(segment("seg-1.ndjson", ts(0), &[("a.json", 3)]));

        let json = serde_json::to_string_pretty(&manifest).unwrap();
        let restored: TableManifest = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.schema_version, 1);
        assert_eq!(restored.segments.len(), 1);
        assert_eq!(restored.segments[0].files[0].filename, "a.json");
        assert_eq!(restored.total_rows(), 3);
    }

    #[test]
    fn test_loaded_filenames_distinct_across_segments() {
        let mut manifest = TableManifest::default();
        manifest.record_segment(segment("seg-1.ndjson", ts(0), &[("a.json", 2), ("b.json", 1)]));
        manifest.record_segment(segment("seg-2.ndjson", ts(1), &[("c.json", 4)]));

        let loaded = manifest.loaded_filenames();
        assert_eq!(loaded.len(), 3);
        assert!(loaded.contains("a.json"));
        assert!(loaded.contains("b.json"));
        assert!(loaded.contains("c.json"));
    }

    #[test]
    fn test_partition_bootstrap_everything_new() {
        let manifest = TableManifest::default();
        let (new, already) =
            manifest.partition_candidates(vec![candidate("a.json"), candidate("b.json")]);

        assert_eq!(new.len(), 2);
        assert!(already.is_empty());
    }

    #[test]
    fn test_partition_excludes_loaded_files() {
        let mut manifest = TableManifest::default();
        manifest.record_segment(segment("seg-1.ndjson", ts(0), &[("a.json", 2)]));

        let (new, already) =
            manifest.partition_candidates(vec![candidate("a.json"), candidate("b.json")]);

        assert_eq!(new.len(), 1);
        assert_eq!(new[0].basename, "b.json");
        assert_eq!(already.len(), 1);
        assert_eq!(already[0].basename, "a.json");
    }

    #[test]
    fn test_deleted_file_stays_loaded() {
        let mut manifest = TableManifest::default();
        manifest.record_segment(segment("seg-1.ndjson", ts(0), &[("a.json", 2)]));

        // File deleted from the directory, then re-added with the same
        // name. Basename identity keeps it excluded.
        let (new, already) = manifest.partition_candidates(vec![candidate("a.json")]);
        assert!(new.is_empty());
        assert_eq!(already.len(), 1);
    }

    #[test]
    fn test_load_ats_one_per_run() {
        let mut manifest = TableManifest::default();
        manifest.record_segment(segment("seg-1.ndjson", ts(0), &[("a.json", 2)]));
        manifest.record_segment(segment("seg-2.ndjson", ts(1), &[("b.json", 5)]));

        let load_ats = manifest.load_ats();
        assert_eq!(load_ats.len(), 2);
        assert_eq!(manifest.total_rows(), 7);
    }
}
