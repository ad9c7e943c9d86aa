//! Candidate file discovery for the load directory.
//!
//! Lists the regular files currently present in the configured load
//! path, sorted by basename for deterministic ordering. Subdirectories
//! are only entered when recursion is explicitly enabled, and internal
//! entries (dotfiles, `_staging` style directories) are always skipped.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use tracing::warn;

use crate::error::{
    DiscoveryError, DuplicateBasenameSnafu, NotADirectorySnafu, PathMissingSnafu, ReadDirSnafu,
};

/// Listing behavior for the load directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Only consider files whose basename ends with this suffix
    /// (e.g., ".json" or ".ndjson"). `None` accepts every file.
    #[serde(default)]
    pub extension: Option<String>,
    /// Recurse into subdirectories. Off by default.
    #[serde(default)]
    pub recursive: bool,
}

/// A candidate input file: absolute path plus its identity key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Absolute path to the file.
    pub path: PathBuf,
    /// Path-independent basename, used to detect "already loaded".
    pub basename: String,
}

/// List candidate event files in the load directory.
///
/// An empty directory is a valid, empty result. A missing or
/// unreadable path fails the run before anything else happens.
pub fn list_event_files(
    dir: &Path,
    config: &ListingConfig,
) -> Result<Vec<DiscoveredFile>, DiscoveryError> {
    let display = dir.display().to_string();

    let metadata = fs::metadata(dir).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            PathMissingSnafu { path: &display }.build()
        } else {
            DiscoveryError::ReadDir {
                path: display.clone(),
                source,
            }
        }
    })?;
    ensure!(metadata.is_dir(), NotADirectorySnafu { path: &display });

    // Anchor relative load paths once, so every discovered path is
    // absolute no matter where the process was launched from.
    let dir = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()
            .context(ReadDirSnafu { path: &display })?
            .join(dir)
    };

    let mut files = Vec::new();
    collect_files(&dir, config, &mut files)?;
    files.sort_by(|a, b| a.basename.cmp(&b.basename));

    // Basename is the identity key, so a collision across
    // subdirectories would make the partition ambiguous.
    for pair in files.windows(2) {
        ensure!(
            pair[0].basename != pair[1].basename,
            DuplicateBasenameSnafu {
                basename: &pair[0].basename,
            }
        );
    }

    Ok(files)
}

fn collect_files(
    dir: &Path,
    config: &ListingConfig,
    files: &mut Vec<DiscoveredFile>,
) -> Result<(), DiscoveryError> {
    let display = dir.display().to_string();
    let entries = fs::read_dir(dir).context(ReadDirSnafu { path: &display })?;

    for entry in entries {
        let entry = entry.context(ReadDirSnafu { path: &display })?;
        let name = entry.file_name();
        let Some(basename) = name.to_str() else {
            warn!(path = %entry.path().display(), "Skipping non-UTF-8 file name");
            continue;
        };
        if basename.starts_with('.') || basename.starts_with('_') {
            continue;
        }

        let file_type = entry
            .file_type()
            .context(ReadDirSnafu { path: &display })?;
        if file_type.is_dir() {
            if config.recursive {
                collect_files(&entry.path(), config, files)?;
            }
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        if let Some(ext) = &config.extension
            && !basename.ends_with(ext.as_str())
        {
            continue;
        }

        files.push(DiscoveredFile {
            path: entry.path(),
            basename: basename.to_string(),
        });
    }

    Ok(())
}
