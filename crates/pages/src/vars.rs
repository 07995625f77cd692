//! Variable resolution over the sorted pages.
//!
//! Responsibilities:
//! - Resolve the effective value of a key across all pages.
//! - Provide typed accessors that parse the winning value.
//!
//! Does NOT handle:
//! - Page ordering (see `registry.rs`; resolution consumes the sorted
//!   views as-is).
//!
//! Invariants:
//! - Explicit pages are consulted before implicit pages; within each
//!   collection, pages are visited in sorted (descending-priority) order.
//! - Within one page, the last declaration of a key wins.

use serde::Serialize;
use thiserror::Error;

use crate::page::PageOrigin;
use crate::registry::PageRegistry;

/// One match for a key, with the page it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved {
    pub key: String,
    pub value: String,
    pub page: String,
    pub origin: PageOrigin,
    pub priority: i32,
}

/// Errors from typed resolution.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("invalid value for {key}: {value:?} is not a {expected}")]
    Invalid {
        key: String,
        value: String,
        expected: &'static str,
    },
}

impl PageRegistry {
    /// The effective value of `key`, from the first page declaring it in
    /// resolution order.
    pub fn resolve(&self, key: &str) -> Option<String> {
        self.pages_in_resolution_order()
            .iter()
            .find_map(|page| page.lookup(key))
            .map(|d| d.value)
    }

    /// Every match for `key`, in precedence order, with provenance.
    pub fn resolve_all(&self, key: &str) -> Vec<Resolved> {
        self.pages_in_resolution_order()
            .iter()
            .filter_map(|page| {
                page.lookup(key).map(|d| Resolved {
                    key: d.key,
                    value: d.value,
                    page: page.name().to_string(),
                    origin: page.origin(),
                    priority: page.priority(),
                })
            })
            .collect()
    }

    /// Resolve `key` as a boolean. Accepts `true`/`false`, `t`/`f`,
    /// `1`/`0`, `yes`/`no`, case-insensitively.
    pub fn resolve_bool(&self, key: &str) -> Result<Option<bool>, ResolveError> {
        self.resolve_parsed(key, "boolean", parse_bool)
    }

    /// Resolve `key` as a signed integer.
    pub fn resolve_i64(&self, key: &str) -> Result<Option<i64>, ResolveError> {
        self.resolve_parsed(key, "integer", |v| v.parse().ok())
    }

    /// Resolve `key` as a floating-point number.
    pub fn resolve_f64(&self, key: &str) -> Result<Option<f64>, ResolveError> {
        self.resolve_parsed(key, "number", |v| v.parse().ok())
    }

    fn resolve_parsed<T>(
        &self,
        key: &str,
        expected: &'static str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<Option<T>, ResolveError> {
        match self.resolve(key) {
            None => Ok(None),
            Some(value) => parse(&value).map(Some).ok_or_else(|| ResolveError::Invalid {
                key: key.to_string(),
                value,
                expected,
            }),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" => Some(true),
        "false" | "f" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryOptions;
    use crate::search_path::SearchPath;

    fn registry() -> PageRegistry {
        RegistryOptions::new()
            .with_search_path(SearchPath::new())
            .build()
            .unwrap()
    }

    #[test]
    fn test_resolve_highest_priority_wins() {
        let r = registry();
        r.register_explicit_page_text("defaults", 0, "audio-volume 0.5\n");
        r.register_explicit_page_text("user", 10, "audio-volume 0.9\n");

        assert_eq!(r.resolve("audio-volume").as_deref(), Some("0.9"));
    }

    #[test]
    fn test_resolve_equal_priority_earlier_registration_wins() {
        let r = registry();
        r.register_explicit_page_text("first", 0, "threads 2\n");
        r.register_explicit_page_text("second", 0, "threads 8\n");

        assert_eq!(r.resolve("threads").as_deref(), Some("2"));
    }

    #[test]
    fn test_resolve_missing_key() {
        let r = registry();
        r.register_explicit_page_text("only", 0, "a 1\n");
        assert!(r.resolve("missing").is_none());
    }

    #[test]
    fn test_resolve_all_provenance() {
        let r = registry();
        r.register_explicit_page_text("defaults", 0, "threads 2\n");
        r.register_explicit_page_text("user", 10, "threads 8\n");

        let all = r.resolve_all("threads");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].page, "user");
        assert_eq!(all[0].value, "8");
        assert_eq!(all[0].priority, 10);
        assert_eq!(all[1].page, "defaults");
        assert_eq!(all[1].origin, PageOrigin::Explicit);
    }

    #[test]
    fn test_resolve_bool_spellings() {
        let r = registry();
        r.register_explicit_page_text(
            "flags",
            0,
            "f1 true\nf2 T\nf3 1\nf4 yes\nf5 false\nf6 F\nf7 0\nf8 no\n",
        );
        for key in ["f1", "f2", "f3", "f4"] {
            assert_eq!(r.resolve_bool(key).unwrap(), Some(true), "{key}");
        }
        for key in ["f5", "f6", "f7", "f8"] {
            assert_eq!(r.resolve_bool(key).unwrap(), Some(false), "{key}");
        }
    }

    #[test]
    fn test_resolve_bool_invalid() {
        let r = registry();
        r.register_explicit_page_text("flags", 0, "flag maybe\n");
        assert!(matches!(
            r.resolve_bool("flag"),
            Err(ResolveError::Invalid { .. })
        ));
    }

    #[test]
    fn test_resolve_numbers() {
        let r = registry();
        r.register_explicit_page_text("nums", 0, "width 1280\nscale 1.5\n");
        assert_eq!(r.resolve_i64("width").unwrap(), Some(1280));
        assert_eq!(r.resolve_f64("scale").unwrap(), Some(1.5));
        assert_eq!(r.resolve_i64("absent").unwrap(), None);
        assert!(r.resolve_i64("scale").is_err());
    }
}
