//! Configuration page model and page-text parsing.
//!
//! Responsibilities:
//! - Define `ConfigPage`, `Declaration`, and `PageOrigin`.
//! - Parse page text into ordered declarations (tolerant, line-oriented).
//! - Provide interior-mutable priority and declarations so `Arc<ConfigPage>`
//!   handles stay shareable without holding the registry lock.
//!
//! Does NOT handle:
//! - Reading page files from disk (see `loader.rs`).
//! - Sorting pages or resolution order (see `registry.rs`).
//!
//! Invariants:
//! - `sequence` is assigned at creation and never changes.
//! - Declarations preserve source line order.
//! - After `set_priority`, callers must invalidate the registry sort order
//!   with `PageRegistry::mark_unsorted` for the change to take effect.

use std::sync::RwLock;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

use serde::Serialize;

/// How a page entered the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOrigin {
    /// Discovered on the search path by filename pattern.
    Implicit,
    /// Installed directly by a caller at runtime.
    Explicit,
}

/// One `key value` pair from a page, with the 0-based line it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declaration {
    pub key: String,
    pub value: String,
    pub line: usize,
}

/// A named, prioritized source of configuration declarations.
///
/// Page text is line-oriented: the first whitespace-separated token of a
/// line is the key and the rest of the line (trimmed) is the value. Lines
/// starting with `#` are comments; blank lines are ignored. A line with a
/// key but no value is malformed; it is skipped and counted, never fatal.
#[derive(Debug)]
pub struct ConfigPage {
    name: String,
    origin: PageOrigin,
    sequence: u64,
    priority: AtomicI32,
    declarations: RwLock<Vec<Declaration>>,
    parse_errors: AtomicUsize,
}

impl ConfigPage {
    pub(crate) fn new(name: String, origin: PageOrigin, sequence: u64, priority: i32) -> Self {
        Self {
            name,
            origin,
            sequence,
            priority: AtomicI32::new(priority),
            declarations: RwLock::new(Vec::new()),
            parse_errors: AtomicUsize::new(0),
        }
    }

    /// Display name; for implicit pages, the source file path.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> PageOrigin {
        self.origin
    }

    /// Load-order tie-break: lower sequence sorts first among equal
    /// priorities.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Sort priority; higher overrides lower.
    pub fn priority(&self) -> i32 {
        self.priority.load(Ordering::Acquire)
    }

    /// Change the page's sort priority.
    ///
    /// The registry does not observe this directly: call
    /// `PageRegistry::mark_unsorted` afterwards, or the stale order may
    /// persist until the next mutation-triggered invalidation.
    pub fn set_priority(&self, priority: i32) {
        self.priority.store(priority, Ordering::Release);
    }

    /// Number of lines skipped as malformed during the last parse.
    pub fn parse_error_count(&self) -> usize {
        self.parse_errors.load(Ordering::Acquire)
    }

    /// Replace the page's declarations by parsing `text`.
    pub fn set_text(&self, text: &str) {
        let (declarations, errors) = parse_page_text(text);
        if errors > 0 {
            tracing::debug!(
                page = %self.name,
                skipped = errors,
                "skipped malformed declaration lines"
            );
        }
        let mut guard = self.declarations.write().unwrap_or_else(|e| e.into_inner());
        *guard = declarations;
        self.parse_errors.store(errors, Ordering::Release);
    }

    /// Append a single declaration, after any parsed from text.
    pub fn add_declaration(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut guard = self.declarations.write().unwrap_or_else(|e| e.into_inner());
        let line = guard.len();
        guard.push(Declaration {
            key: key.into(),
            value: value.into(),
            line,
        });
    }

    /// Remove all declarations.
    pub fn clear(&self) {
        let mut guard = self.declarations.write().unwrap_or_else(|e| e.into_inner());
        guard.clear();
        self.parse_errors.store(0, Ordering::Release);
    }

    pub fn num_declarations(&self) -> usize {
        self.declarations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// The `n`th declaration in source order.
    ///
    /// Out-of-range `n` is a programmer error; the call returns `None`
    /// rather than panicking.
    pub fn declaration(&self, n: usize) -> Option<Declaration> {
        let guard = self.declarations.read().unwrap_or_else(|e| e.into_inner());
        guard.get(n).cloned()
    }

    /// Snapshot of the declarations in source order.
    pub fn declarations(&self) -> Vec<Declaration> {
        self.declarations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The winning declaration for `key` within this page.
    ///
    /// When a key is declared more than once in one page, the last
    /// declaration wins (later lines override earlier ones).
    pub fn lookup(&self, key: &str) -> Option<Declaration> {
        let guard = self.declarations.read().unwrap_or_else(|e| e.into_inner());
        guard.iter().rev().find(|d| d.key == key).cloned()
    }
}

/// Parse page text into declarations, returning the declarations in source
/// order and the count of malformed lines skipped.
fn parse_page_text(text: &str) -> (Vec<Declaration>, usize) {
    let mut declarations = Vec::new();
    let mut errors = 0;

    for (line_number, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once(char::is_whitespace) {
            Some((key, rest)) => declarations.push(Declaration {
                key: key.to_string(),
                value: rest.trim().to_string(),
                line: line_number,
            }),
            None => {
                // A bare key with no value has no meaning here.
                errors += 1;
            }
        }
    }

    (declarations, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with(text: &str) -> ConfigPage {
        let page = ConfigPage::new("test".to_string(), PageOrigin::Explicit, 0, 0);
        page.set_text(text);
        page
    }

    #[test]
    fn test_parse_skips_comments_and_blank_lines() {
        let page = page_with("# header comment\n\nwindow-title My Game\n\n# trailing\n");
        assert_eq!(page.num_declarations(), 1);
        let d = page.declaration(0).unwrap();
        assert_eq!(d.key, "window-title");
        assert_eq!(d.value, "My Game");
        assert_eq!(d.line, 2);
    }

    #[test]
    fn test_parse_counts_malformed_lines() {
        let page = page_with("fullscreen\nwin-size 800 600\n");
        assert_eq!(page.num_declarations(), 1);
        assert_eq!(page.parse_error_count(), 1);
        assert_eq!(page.declaration(0).unwrap().value, "800 600");
    }

    #[test]
    fn test_lookup_last_declaration_wins_within_page() {
        let page = page_with("model-cache /a\nmodel-cache /b\n");
        assert_eq!(page.lookup("model-cache").unwrap().value, "/b");
    }

    #[test]
    fn test_lookup_missing_key() {
        let page = page_with("audio-volume 0.8\n");
        assert!(page.lookup("video-volume").is_none());
    }

    #[test]
    fn test_set_text_replaces_previous_declarations() {
        let page = page_with("a 1\nb 2\n");
        page.set_text("c 3\n");
        assert_eq!(page.num_declarations(), 1);
        assert!(page.lookup("a").is_none());
        assert_eq!(page.lookup("c").unwrap().value, "3");
    }

    #[test]
    fn test_add_declaration_appends() {
        let page = page_with("a 1\n");
        page.add_declaration("b", "2");
        assert_eq!(page.num_declarations(), 2);
        assert_eq!(page.lookup("b").unwrap().value, "2");
    }

    #[test]
    fn test_priority_mutation_is_visible() {
        let page = page_with("");
        assert_eq!(page.priority(), 0);
        page.set_priority(50);
        assert_eq!(page.priority(), 50);
    }
}
