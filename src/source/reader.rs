//! NDJSON event file parsing.
//!
//! Reads one file line-by-line, one JSON object per line. A single
//! malformed line rejects the whole file: the caller commits either
//! every row of a file or none of them, so silently skipping bad lines
//! is not an option.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::{Map, Value};
use snafu::prelude::*;
use tracing::debug;

use crate::error::{
    InvalidJsonSnafu, NotAnObjectSnafu, OpenSnafu, ParseError, ReadLineSnafu, ReservedColumnSnafu,
};
use crate::row::{FILENAME_COLUMN, LOAD_AT_COLUMN};

/// Parse an NDJSON event file into a sequence of event objects.
///
/// Blank lines are tolerated (the trailing newline is optional, and so
/// is its absence). Event fields are passed through untouched; the
/// provenance columns are attached later, at the run level, so a field
/// named `load_at` or `filename` in the input is rejected here rather
/// than silently overwritten.
pub fn read_event_file(path: &Path) -> Result<Vec<Map<String, Value>>, ParseError> {
    let display = path.display().to_string();
    let file = File::open(path).context(OpenSnafu { path: &display })?;
    let reader = BufReader::new(file);

    let mut events = Vec::new();
    for (index, line_result) in reader.lines().enumerate() {
        let line_number = index + 1;
        let line = line_result.context(ReadLineSnafu {
            path: &display,
            line: line_number,
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(&line).context(InvalidJsonSnafu {
            path: &display,
            line: line_number,
        })?;
        let Value::Object(event) = value else {
            return NotAnObjectSnafu {
                path: &display,
                line: line_number,
            }
            .fail();
        };

        for reserved in [LOAD_AT_COLUMN, FILENAME_COLUMN] {
            ensure!(
                !event.contains_key(reserved),
                ReservedColumnSnafu {
                    path: &display,
                    line: line_number,
                    column: reserved,
                }
            );
        }

        events.push(event);
    }

    debug!(path = %path.display(), events = events.len(), "Parsed event file");
    Ok(events)
}
