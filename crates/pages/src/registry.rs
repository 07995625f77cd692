//! The configuration page registry.
//!
//! Responsibilities:
//! - Own the implicit and explicit page collections.
//! - Orchestrate implicit discovery (explicitly triggered, exactly once
//!   until a reload is requested).
//! - Keep a deterministic resolution order via a lazy, stable re-sort.
//! - Expose the compiled pattern families and the search path.
//!
//! Does NOT handle:
//! - Walking the filesystem (see `discovery.rs`).
//! - Reading or decrypting files (see `loader.rs`).
//! - Resolving variables (see `vars.rs`).
//!
//! Invariants:
//! - All registry state lives behind one coarse mutex; the check-and-sort
//!   path runs under it, so readers never observe a partially sorted
//!   sequence.
//! - When `pages_sorted` is true, each collection is ordered by descending
//!   priority with ascending sequence as tie-break (stable across
//!   re-sorts).
//! - `loaded_implicit` implies discovery has run at least once; it does
//!   not imply any pages were found.
//! - Accessors never trigger implicit discovery; callers use
//!   `ensure_implicit_pages_loaded` explicitly.

use std::cmp;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use crate::constants::DEFAULT_IMPLICIT_PRIORITY;
use crate::crypt::MasterKeySource;
use crate::discovery::{DirScanner, DiscoveredFile, FileDiscovery};
use crate::error::RegistryError;
use crate::loader::PageLoader;
use crate::page::{ConfigPage, PageOrigin};
use crate::pattern::{PatternFamily, PatternSet};
use crate::search_path::SearchPath;

static GLOBAL_REGISTRY: OnceLock<PageRegistry> = OnceLock::new();

/// Builder-style options for constructing a `PageRegistry`.
pub struct RegistryOptions {
    search_path: Option<SearchPath>,
    extra_plain_patterns: Vec<String>,
    extra_encrypted_patterns: Vec<String>,
    extra_executable_patterns: Vec<String>,
    key_source: MasterKeySource,
    discovery: Option<Box<dyn FileDiscovery>>,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryOptions {
    pub fn new() -> Self {
        Self {
            search_path: None,
            extra_plain_patterns: Vec::new(),
            extra_encrypted_patterns: Vec::new(),
            extra_executable_patterns: Vec::new(),
            key_source: MasterKeySource::Keyring,
            discovery: None,
        }
    }

    /// Use a fixed search path instead of assembling one from the
    /// environment.
    pub fn with_search_path(mut self, search_path: SearchPath) -> Self {
        self.search_path = Some(search_path);
        self
    }

    /// Extend the compiled-in plain patterns.
    pub fn with_plain_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.extra_plain_patterns.push(pattern.into());
        self
    }

    /// Extend the compiled-in encrypted patterns.
    pub fn with_encrypted_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.extra_encrypted_patterns.push(pattern.into());
        self
    }

    /// Extend the compiled-in executable patterns.
    pub fn with_executable_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.extra_executable_patterns.push(pattern.into());
        self
    }

    /// Key source for decrypting encrypted pages.
    pub fn with_key_source(mut self, key_source: MasterKeySource) -> Self {
        self.key_source = key_source;
        self
    }

    /// Replace the default filesystem discovery (primarily for testing).
    pub fn with_discovery(mut self, discovery: Box<dyn FileDiscovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    /// Compile the patterns and construct the registry. Discovery does not
    /// run until `ensure_implicit_pages_loaded` is called.
    pub fn build(self) -> Result<PageRegistry, RegistryError> {
        let patterns = PatternSet::with_extra(
            &self.extra_plain_patterns,
            &self.extra_encrypted_patterns,
            &self.extra_executable_patterns,
        )?;
        let search_path = self.search_path.unwrap_or_else(SearchPath::from_env);
        let discovery = self.discovery.unwrap_or_else(|| Box::new(DirScanner));

        Ok(PageRegistry {
            inner: Mutex::new(RegistryInner {
                implicit: Vec::new(),
                explicit: Vec::new(),
                loaded_implicit: false,
                pages_sorted: true,
                next_sequence: 0,
                search_path,
                patterns,
                discovery,
                loader: PageLoader::new(self.key_source),
            }),
        })
    }
}

struct RegistryInner {
    implicit: Vec<Arc<ConfigPage>>,
    explicit: Vec<Arc<ConfigPage>>,
    loaded_implicit: bool,
    pages_sorted: bool,
    next_sequence: u64,
    search_path: SearchPath,
    patterns: PatternSet,
    discovery: Box<dyn FileDiscovery>,
    loader: PageLoader,
}

impl RegistryInner {
    fn next_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }
}

/// The collection of configuration pages and their resolution order.
pub struct PageRegistry {
    inner: Mutex<RegistryInner>,
}

impl PageRegistry {
    /// Construct the process-wide registry during startup. The first call
    /// builds and installs it; later calls return the existing instance
    /// and ignore their options.
    pub fn init_global(options: RegistryOptions) -> Result<&'static PageRegistry, RegistryError> {
        if let Some(existing) = GLOBAL_REGISTRY.get() {
            return Ok(existing);
        }
        let registry = options.build()?;
        Ok(GLOBAL_REGISTRY.get_or_init(|| registry))
    }

    /// The process-wide registry, if `init_global` has run. Never
    /// constructs one implicitly.
    pub fn global() -> Option<&'static PageRegistry> {
        GLOBAL_REGISTRY.get()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        // A poisoning panic cannot leave the vectors structurally invalid;
        // the dirty flag forces a fresh sort on the next read.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run implicit discovery if it has not run yet. A no-op on every call
    /// after the first, until `reload_implicit_pages` is requested.
    pub fn ensure_implicit_pages_loaded(&self) {
        let mut inner = self.lock();
        if inner.loaded_implicit {
            return;
        }
        let files = inner.discovery.discover(&inner.search_path, &inner.patterns);
        for file in files {
            Self::load_implicit_page(&mut inner, &file);
        }
        inner.loaded_implicit = true;
        inner.pages_sorted = false;
        tracing::info!(pages = inner.implicit.len(), "loaded implicit pages");
    }

    /// Unconditionally re-run implicit discovery.
    ///
    /// Replace-in-place policy: pages whose backing file is still matched
    /// keep their page object, order, and sequence (contents re-read from
    /// disk; if the re-read fails the previous contents are kept); pages
    /// whose file is no longer matched are dropped; newly matched files
    /// are appended in discovery order. Explicit pages are untouched.
    pub fn reload_implicit_pages(&self) {
        let mut inner = self.lock();
        let files = inner.discovery.discover(&inner.search_path, &inner.patterns);

        let mut retained: Vec<Arc<ConfigPage>> = Vec::new();
        for page in std::mem::take(&mut inner.implicit) {
            match files.iter().find(|f| f.path.display().to_string() == page.name()) {
                Some(file) => {
                    match inner.loader.load(file) {
                        Ok(text) => page.set_text(&text),
                        Err(e) => {
                            tracing::warn!(error = %e, "keeping previous contents for unreadable page")
                        }
                    }
                    retained.push(page);
                }
                None => {
                    tracing::debug!(page = %page.name(), "dropping implicit page; file no longer matched");
                }
            }
        }
        inner.implicit = retained;

        for file in files {
            let name = file.path.display().to_string();
            if inner.implicit.iter().any(|p| p.name() == name) {
                continue;
            }
            Self::load_implicit_page(&mut inner, &file);
        }

        inner.loaded_implicit = true;
        inner.pages_sorted = false;
        tracing::info!(pages = inner.implicit.len(), "reloaded implicit pages");
    }

    fn load_implicit_page(inner: &mut RegistryInner, file: &DiscoveredFile) {
        match inner.loader.load(file) {
            Ok(text) => {
                let sequence = inner.next_sequence();
                let page = Arc::new(ConfigPage::new(
                    file.path.display().to_string(),
                    PageOrigin::Implicit,
                    sequence,
                    DEFAULT_IMPLICIT_PRIORITY,
                ));
                page.set_text(&text);
                inner.implicit.push(page);
            }
            Err(e) => tracing::warn!(error = %e, "skipping unusable page file"),
        }
    }

    /// Whether implicit discovery has run at least once.
    pub fn loaded_implicit(&self) -> bool {
        self.lock().loaded_implicit
    }

    /// Snapshot of the search path used for implicit discovery.
    pub fn search_path(&self) -> SearchPath {
        self.lock().search_path.clone()
    }

    /// Replace the search path. Takes effect on the next explicit load or
    /// reload.
    pub fn set_search_path(&self, search_path: SearchPath) {
        self.lock().search_path = search_path;
    }

    /// Mutate the search path in place.
    pub fn with_search_path_mut<F: FnOnce(&mut SearchPath)>(&self, f: F) {
        f(&mut self.lock().search_path);
    }

    // --- Pattern accessors ------------------------------------------------

    pub fn num_plain_patterns(&self) -> usize {
        self.num_patterns(PatternFamily::Plain)
    }

    pub fn plain_pattern(&self, n: usize) -> Option<String> {
        self.pattern(PatternFamily::Plain, n)
    }

    pub fn num_encrypted_patterns(&self) -> usize {
        self.num_patterns(PatternFamily::Encrypted)
    }

    pub fn encrypted_pattern(&self, n: usize) -> Option<String> {
        self.pattern(PatternFamily::Encrypted, n)
    }

    pub fn num_executable_patterns(&self) -> usize {
        self.num_patterns(PatternFamily::Executable)
    }

    pub fn executable_pattern(&self, n: usize) -> Option<String> {
        self.pattern(PatternFamily::Executable, n)
    }

    /// Pattern count for one family.
    pub fn num_patterns(&self, family: PatternFamily) -> usize {
        self.lock().patterns.family(family).len()
    }

    /// The `n`th pattern of one family, as originally written.
    ///
    /// Out-of-range `n` is a programmer error; the call returns `None`
    /// rather than panicking.
    pub fn pattern(&self, family: PatternFamily, n: usize) -> Option<String> {
        self.lock()
            .patterns
            .family(family)
            .get(n)
            .map(|p| p.as_str().to_string())
    }

    /// All patterns of one family, in order.
    pub fn patterns(&self, family: PatternFamily) -> Vec<String> {
        self.lock()
            .patterns
            .family(family)
            .iter()
            .map(|p| p.as_str().to_string())
            .collect()
    }

    // --- Page accessors ---------------------------------------------------

    pub fn num_implicit_pages(&self) -> usize {
        let mut inner = self.lock();
        Self::check_sort_pages(&mut inner);
        inner.implicit.len()
    }

    /// The `n`th implicit page in resolution order.
    ///
    /// Out-of-range `n` is a programmer error; the call returns `None`
    /// rather than panicking.
    pub fn implicit_page(&self, n: usize) -> Option<Arc<ConfigPage>> {
        let mut inner = self.lock();
        Self::check_sort_pages(&mut inner);
        inner.implicit.get(n).cloned()
    }

    /// Snapshot of the implicit pages in resolution order.
    pub fn implicit_pages(&self) -> Vec<Arc<ConfigPage>> {
        let mut inner = self.lock();
        Self::check_sort_pages(&mut inner);
        inner.implicit.clone()
    }

    pub fn num_explicit_pages(&self) -> usize {
        let mut inner = self.lock();
        Self::check_sort_pages(&mut inner);
        inner.explicit.len()
    }

    /// The `n`th explicit page in resolution order.
    ///
    /// Out-of-range `n` is a programmer error; the call returns `None`
    /// rather than panicking.
    pub fn explicit_page(&self, n: usize) -> Option<Arc<ConfigPage>> {
        let mut inner = self.lock();
        Self::check_sort_pages(&mut inner);
        inner.explicit.get(n).cloned()
    }

    /// Snapshot of the explicit pages in resolution order.
    pub fn explicit_pages(&self) -> Vec<Arc<ConfigPage>> {
        let mut inner = self.lock();
        Self::check_sort_pages(&mut inner);
        inner.explicit.clone()
    }

    /// All pages in the order variable resolution consults them: explicit
    /// pages first, then implicit pages, each by descending priority.
    pub fn pages_in_resolution_order(&self) -> Vec<Arc<ConfigPage>> {
        let mut inner = self.lock();
        Self::check_sort_pages(&mut inner);
        inner
            .explicit
            .iter()
            .chain(inner.implicit.iter())
            .cloned()
            .collect()
    }

    // --- Explicit registration --------------------------------------------

    /// Install an empty explicit page.
    pub fn register_explicit_page(&self, name: impl Into<String>, priority: i32) -> Arc<ConfigPage> {
        let mut inner = self.lock();
        let sequence = inner.next_sequence();
        let page = Arc::new(ConfigPage::new(
            name.into(),
            PageOrigin::Explicit,
            sequence,
            priority,
        ));
        inner.explicit.push(Arc::clone(&page));
        inner.pages_sorted = false;
        page
    }

    /// Install an explicit page parsed from `text`.
    pub fn register_explicit_page_text(
        &self,
        name: impl Into<String>,
        priority: i32,
        text: &str,
    ) -> Arc<ConfigPage> {
        let page = self.register_explicit_page(name, priority);
        page.set_text(text);
        page
    }

    /// Remove a previously registered explicit page. Returns whether the
    /// page was present.
    pub fn unregister_explicit_page(&self, page: &Arc<ConfigPage>) -> bool {
        let mut inner = self.lock();
        let before = inner.explicit.len();
        inner.explicit.retain(|p| !Arc::ptr_eq(p, page));
        let removed = inner.explicit.len() != before;
        if removed {
            inner.pages_sorted = false;
        }
        removed
    }

    // --- Sorting ----------------------------------------------------------

    /// Invalidate the sort order. Call after changing any page's priority;
    /// the next read re-sorts.
    pub fn mark_unsorted(&self) {
        self.lock().pages_sorted = false;
    }

    fn check_sort_pages(inner: &mut RegistryInner) {
        if inner.pages_sorted {
            return;
        }
        sort_pages(&mut inner.implicit);
        sort_pages(&mut inner.explicit);
        inner.pages_sorted = true;
    }
}

fn sort_pages(pages: &mut [Arc<ConfigPage>]) {
    // Stable: equal priorities keep their sequence order across re-sorts.
    pages.sort_by_cached_key(|p| (cmp::Reverse(p.priority()), p.sequence()));
}
