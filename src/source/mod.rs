//! Input side of the loader: file discovery and NDJSON parsing.

pub mod listing;
pub mod reader;

pub use listing::{DiscoveredFile, ListingConfig, list_event_files};
pub use reader::read_event_file;
