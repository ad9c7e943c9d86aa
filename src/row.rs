//! Raw row representation: one ingested event plus provenance columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved column: the run's shared load timestamp.
pub const LOAD_AT_COLUMN: &str = "load_at";

/// Reserved column: basename of the source file the row came from.
pub const FILENAME_COLUMN: &str = "filename";

/// One row of the raw table.
///
/// Event fields are pass-through (schema-on-read); `load_at` and
/// `filename` are synthetic. Every row of a run carries the same
/// `load_at`, and every row from one file carries that file's basename.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    /// Original event fields, untouched.
    #[serde(flatten)]
    pub event: Map<String, Value>,
    /// Run-scoped load timestamp, identical across all rows of a run.
    pub load_at: DateTime<Utc>,
    /// Basename of the originating file.
    pub filename: String,
}

impl RawRow {
    /// Build a row from an event object and its provenance.
    pub fn new(event: Map<String, Value>, load_at: DateTime<Utc>, filename: String) -> Self {
        Self {
            event,
            load_at,
            filename,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample_event() -> Map<String, Value> {
        let mut event = Map::new();
        event.insert("event_type".to_string(), json!("play"));
        event.insert("user_id".to_string(), json!("u1"));
        event.insert("duration".to_string(), json!(120));
        event
    }

    #[test]
    fn test_row_round_trip() {
        let load_at = Utc.with_ymd_and_hms(2026, 8, 25, 12, 0, 0).unwrap();
        let row = RawRow::new(sample_event(), load_at, "events_00.json".to_string());

        let json = serde_json::to_string(&row).unwrap();
        let restored: RawRow = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, row);
        assert_eq!(restored.load_at, load_at);
        assert_eq!(restored.filename, "events_00.json");
        assert_eq!(restored.event.get("event_type"), Some(&json!("play")));
    }

    #[test]
    fn test_row_serializes_event_fields_at_top_level() {
        let load_at = Utc.with_ymd_and_hms(2026, 8, 25, 12, 0, 0).unwrap();
        let row = RawRow::new(sample_event(), load_at, "f.json".to_string());

        let value: Value = serde_json::to_value(&row).unwrap();
        let obj = value.as_object().unwrap();

        // Event fields are flattened next to the provenance columns.
        assert_eq!(obj.get("user_id"), Some(&json!("u1")));
        assert!(obj.contains_key(LOAD_AT_COLUMN));
        assert!(obj.contains_key(FILENAME_COLUMN));
    }
}
