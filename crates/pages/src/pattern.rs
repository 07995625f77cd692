//! Filename pattern families for page classification.
//!
//! Responsibilities:
//! - Compile glob-style filename patterns once at registry construction.
//! - Classify candidate file names into the plain / encrypted / executable
//!   families.
//!
//! Does NOT handle:
//! - Walking the search path (see `discovery.rs`).
//! - Reading or decoding the classified files (see `loader.rs`).
//!
//! Invariants:
//! - Patterns are immutable once compiled.
//! - Each family is an independent ordered list.
//! - Classification checks plain, then encrypted, then executable; the
//!   first matching family wins.

use globset::Glob;
use serde::Serialize;

use crate::constants::{
    DEFAULT_ENCRYPTED_PATTERNS, DEFAULT_EXECUTABLE_PATTERNS, DEFAULT_PLAIN_PATTERNS,
};
use crate::error::RegistryError;

/// File-handling policy associated with a matching filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternFamily {
    /// Parsed directly as declarations.
    Plain,
    /// Decrypted before parsing.
    Encrypted,
    /// Executed; standard output is parsed as declarations.
    Executable,
}

impl PatternFamily {
    /// All families, in classification order.
    pub const ALL: [PatternFamily; 3] = [
        PatternFamily::Plain,
        PatternFamily::Encrypted,
        PatternFamily::Executable,
    ];
}

/// A compiled glob-style filename pattern retaining its source string.
#[derive(Debug, Clone)]
pub struct PagePattern {
    source: String,
    matcher: globset::GlobMatcher,
}

impl PagePattern {
    pub fn new(pattern: &str) -> Result<Self, RegistryError> {
        let glob = Glob::new(pattern).map_err(|e| RegistryError::Pattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            source: pattern.to_string(),
            matcher: glob.compile_matcher(),
        })
    }

    /// The pattern as originally written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.matcher.is_match(file_name)
    }
}

/// The three independent pattern families used to classify candidate files.
#[derive(Debug, Clone)]
pub struct PatternSet {
    plain: Vec<PagePattern>,
    encrypted: Vec<PagePattern>,
    executable: Vec<PagePattern>,
}

impl PatternSet {
    /// Build the compiled-in defaults, extended with caller-supplied
    /// patterns per family.
    pub fn with_extra(
        plain: &[String],
        encrypted: &[String],
        executable: &[String],
    ) -> Result<Self, RegistryError> {
        Ok(Self {
            plain: compile(DEFAULT_PLAIN_PATTERNS, plain)?,
            encrypted: compile(DEFAULT_ENCRYPTED_PATTERNS, encrypted)?,
            executable: compile(DEFAULT_EXECUTABLE_PATTERNS, executable)?,
        })
    }

    /// The compiled-in defaults alone.
    pub fn compiled_in() -> Self {
        // The defaults are literal globs; compilation cannot fail.
        match Self::with_extra(&[], &[], &[]) {
            Ok(set) => set,
            Err(_) => Self {
                plain: Vec::new(),
                encrypted: Vec::new(),
                executable: Vec::new(),
            },
        }
    }

    pub fn family(&self, family: PatternFamily) -> &[PagePattern] {
        match family {
            PatternFamily::Plain => &self.plain,
            PatternFamily::Encrypted => &self.encrypted,
            PatternFamily::Executable => &self.executable,
        }
    }

    /// Classify a file name, returning the first family with a matching
    /// pattern.
    pub fn classify(&self, file_name: &str) -> Option<PatternFamily> {
        PatternFamily::ALL
            .into_iter()
            .find(|family| self.family(*family).iter().any(|p| p.matches(file_name)))
    }
}

fn compile(defaults: &[&str], extra: &[String]) -> Result<Vec<PagePattern>, RegistryError> {
    defaults
        .iter()
        .copied()
        .chain(extra.iter().map(String::as_str))
        .map(PagePattern::new)
        .collect()
}
