//! File discovery over the search path.
//!
//! Responsibilities:
//! - Define the discovery collaborator seam (`FileDiscovery`).
//! - Provide the default filesystem implementation (`DirScanner`).
//!
//! Does NOT handle:
//! - Reading or decoding discovered files (see `loader.rs`).
//! - Deciding when discovery runs (see `registry.rs`).
//!
//! Invariants:
//! - Results are ordered: directories in search-path order, file names
//!   byte-wise sorted within each directory, so discovery order is
//!   deterministic for a given filesystem state.
//! - An unreadable directory or entry never aborts the pass; it is skipped
//!   with a trace.

use std::path::PathBuf;

use crate::pattern::{PatternFamily, PatternSet};
use crate::search_path::SearchPath;

/// A file found on the search path, with the family that claimed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub family: PatternFamily,
}

/// The file-discovery collaborator: given a search path and the compiled
/// pattern families, produce the ordered set of matching files.
pub trait FileDiscovery: Send {
    fn discover(&self, search_path: &SearchPath, patterns: &PatternSet) -> Vec<DiscoveredFile>;
}

/// Default discovery: scan each search-path directory on the local
/// filesystem.
#[derive(Debug, Default)]
pub struct DirScanner;

impl FileDiscovery for DirScanner {
    fn discover(&self, search_path: &SearchPath, patterns: &PatternSet) -> Vec<DiscoveredFile> {
        let mut found = Vec::new();

        for dir in search_path.iter() {
            let entries = match std::fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::debug!(dir = %dir.display(), error = %e, "skipping unreadable search directory");
                    continue;
                }
            };

            let mut names: Vec<String> = Vec::new();
            for entry in entries {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::debug!(dir = %dir.display(), error = %e, "skipping unreadable directory entry");
                        continue;
                    }
                };
                let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
                if !is_file {
                    continue;
                }
                match entry.file_name().into_string() {
                    Ok(name) => names.push(name),
                    Err(_) => {
                        tracing::debug!(dir = %dir.display(), "skipping non-UTF-8 file name");
                    }
                }
            }
            names.sort_unstable();

            for name in names {
                if let Some(family) = patterns.classify(&name) {
                    found.push(DiscoveredFile {
                        path: dir.join(&name),
                        family,
                    });
                }
            }
        }

        found
    }
}
