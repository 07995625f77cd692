//! Error types for registry construction.
//!
//! Responsibilities:
//! - Define error variants for failures while building a `PageRegistry`.
//!
//! Does NOT handle:
//! - Per-file load failures during discovery (see `loader.rs`); those are
//!   logged and skipped, never surfaced to the caller.
//! - Encryption failures (see `crypt.rs`).
//!
//! Invariants:
//! - All variants carry enough context to identify the offending input.

use thiserror::Error;

/// Errors that can occur while constructing a `PageRegistry`.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A caller-supplied filename pattern failed to compile.
    #[error("invalid filename pattern {pattern:?}: {message}")]
    Pattern { pattern: String, message: String },
}
