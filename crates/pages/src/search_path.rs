//! Ordered search directories for implicit page discovery.
//!
//! Responsibilities:
//! - Hold the ordered list of directories discovery scans.
//! - Assemble the default search path from the environment and the
//!   platform config directory.
//!
//! Does NOT handle:
//! - Walking the directories (see `discovery.rs`).
//! - Triggering discovery; mutating the search path only affects the next
//!   explicit load or reload.
//!
//! Invariants:
//! - Directory order is precedence order: among equal-priority pages,
//!   files from earlier directories win.
//! - `CONFSTACK_DIR` outranks `CONFSTACK_PATH`, which outranks the
//!   platform config directory.

use std::path::{Path, PathBuf};

use crate::constants::{APP_NAME, ENV_PAGE_DIR, ENV_PAGE_PATH};
use crate::env::env_var_or_none;

/// Ordered list of directories consulted during implicit discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    /// An empty search path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble the search path from the environment:
    /// `CONFSTACK_DIR` first, then each entry of `CONFSTACK_PATH` (platform
    /// path-list syntax), then the platform config directory (e.g.
    /// `~/.config/confstack`).
    pub fn from_env() -> Self {
        let mut path = Self::new();

        if let Some(dir) = env_var_or_none(ENV_PAGE_DIR) {
            path.append_directory(dir);
        }
        if let Some(list) = env_var_or_none(ENV_PAGE_PATH) {
            for dir in std::env::split_paths(&list) {
                if !dir.as_os_str().is_empty() {
                    path.append_directory(dir);
                }
            }
        }
        if let Some(dir) = platform_config_dir() {
            path.append_directory(dir);
        }

        path
    }

    /// Append a directory at the lowest-precedence position.
    pub fn append_directory(&mut self, dir: impl Into<PathBuf>) {
        self.dirs.push(dir.into());
    }

    /// Insert a directory at the highest-precedence position.
    pub fn prepend_directory(&mut self, dir: impl Into<PathBuf>) {
        self.dirs.insert(0, dir.into());
    }

    /// Remove all directories.
    pub fn clear(&mut self) {
        self.dirs.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn num_directories(&self) -> usize {
        self.dirs.len()
    }

    /// The directories in precedence order.
    pub fn directories(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Iterate the directories in precedence order.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.dirs.iter().map(PathBuf::as_path)
    }
}

/// The platform-appropriate config directory for confstack:
/// - Linux/macOS: `~/.config/confstack`
/// - Windows: `%AppData%\confstack`
fn platform_config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
}
