//! Environment variable helpers and `.env` bootstrap.
//!
//! Responsibilities:
//! - Read environment variables with empty/whitespace filtering.
//! - Load a `.env` file on request, behind the `DOTENV_DISABLED` gate.
//!
//! Does NOT handle:
//! - Assembling the search path from the environment (see
//!   `search_path.rs`).
//!
//! Invariants:
//! - Empty or whitespace-only environment variables are treated as unset.
//! - Returned values are trimmed.
//! - `load_dotenv` must be called explicitly; the library never loads
//!   `.env` files on its own.
//! - Dotenv errors never include raw `.env` line contents.

use std::io::ErrorKind;

use thiserror::Error;

/// Errors from the `.env` bootstrap.
#[derive(Error, Debug)]
pub enum EnvError {
    /// Failed to parse the `.env` file due to invalid syntax.
    ///
    /// Only the byte index of the failure is reported, never the offending
    /// line content.
    #[error(
        "failed to parse .env file at position {error_index}. Hint: set DOTENV_DISABLED=1 to skip .env loading"
    )]
    DotenvParse { error_index: usize },

    /// Failed to read the `.env` file due to an I/O error.
    #[error("failed to read .env file: {kind}")]
    DotenvIo { kind: ErrorKind },

    /// Unknown dotenv error (future variants from the dotenvy crate).
    #[error("failed to load .env file. Hint: set DOTENV_DISABLED=1 to skip .env loading")]
    DotenvUnknown,
}

/// Read an environment variable, returning `None` if unset, empty, or
/// whitespace-only. Returns the trimmed value if present.
pub fn env_var_or_none(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == s.len() {
            Some(s)
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Check if dotenv loading is disabled via environment variable.
fn dotenv_disabled() -> bool {
    matches!(
        std::env::var("DOTENV_DISABLED").ok().as_deref(),
        Some("true") | Some("1")
    )
}

/// Load environment variables from a `.env` file if present.
///
/// Missing `.env` files are silently ignored. If `DOTENV_DISABLED` is set
/// to "true" or "1", nothing is loaded (useful for testing).
pub fn load_dotenv() -> Result<(), EnvError> {
    if dotenv_disabled() {
        return Ok(());
    }

    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(e) if is_not_found(&e) => Ok(()),
        Err(dotenvy::Error::LineParse(_, idx)) => Err(EnvError::DotenvParse { error_index: idx }),
        Err(dotenvy::Error::Io(io_err)) => Err(EnvError::DotenvIo {
            kind: io_err.kind(),
        }),
        Err(_) => Err(EnvError::DotenvUnknown),
    }
}

fn is_not_found(err: &dotenvy::Error) -> bool {
    matches!(
        err,
        dotenvy::Error::Io(io_err) if io_err.kind() == ErrorKind::NotFound
    )
}
