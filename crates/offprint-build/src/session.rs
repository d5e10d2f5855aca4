//! Per-build-cycle state.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Tracks what happened during the current full build, so a notebook
/// referenced by several artifacts converts at most once per cycle. The
/// host resets it when a new full build starts; a rebuild after a clean
/// then converts everything again.
#[derive(Debug, Default)]
pub struct BuildSession {
    converted: HashSet<PathBuf>,
    pages: HashSet<PathBuf>,
}

impl BuildSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything from the previous build cycle.
    pub fn reset(&mut self) {
        self.converted.clear();
        self.pages.clear();
    }

    /// Whether this notebook was already converted this cycle.
    pub fn is_converted(&self, notebook: &Path) -> bool {
        self.converted.contains(notebook)
    }

    /// Record a completed conversion.
    pub fn mark_converted(&mut self, notebook: PathBuf) {
        self.converted.insert(notebook);
    }

    /// Record a page discovered to be notebook-powered.
    pub fn observe_page(&mut self, page: PathBuf) {
        self.pages.insert(page);
    }

    /// Pages observed as notebook-powered this cycle, for hosts that
    /// surface the set (for example to link each page to its notebook).
    pub fn pages(&self) -> &HashSet<PathBuf> {
        &self.pages
    }
}
