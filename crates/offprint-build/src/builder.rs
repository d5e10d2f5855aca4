//! Converting notebook-powered pages as the host builds them.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use offprint_convert::{CellExecutor, ConvertError, Converter};

use crate::page::notebook_for_page;
use crate::session::BuildSession;

/// Default artifact name the host's page-rendering step reads.
pub const DEFAULT_CONTENTS_NAME: &str = "contents.lr";

/// Produces a fresh execution session for each notebook, so interpreter
/// state never leaks between documents.
pub type SessionFactory = Box<dyn Fn() -> Box<dyn CellExecutor>>;

/// Errors from building a page's notebook artifact.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Converts notebook-powered pages during a host site build.
///
/// The host wires two lifecycle hooks: [`begin_build`] once when a full
/// build starts, and [`build_page`] for each page before the host's own
/// artifact step runs, so the freshly written contents file is what the
/// page build consumes. Rebuilding the same page within one cycle is a
/// no-op.
///
/// [`begin_build`]: NotebookBuilder::begin_build
/// [`build_page`]: NotebookBuilder::build_page
pub struct NotebookBuilder {
    converter: Converter,
    new_session: SessionFactory,
    session: BuildSession,
    contents_name: String,
    source_url: Option<String>,
}

impl NotebookBuilder {
    pub fn new(converter: Converter, new_session: SessionFactory) -> Self {
        Self {
            converter,
            new_session,
            session: BuildSession::new(),
            contents_name: DEFAULT_CONTENTS_NAME.to_string(),
            source_url: None,
        }
    }

    /// Write artifacts under a name other than [`DEFAULT_CONTENTS_NAME`].
    pub fn contents_name(mut self, name: impl Into<String>) -> Self {
        self.contents_name = name.into();
        self
    }

    /// Base URL under which notebook sources are published, surfaced to
    /// host templates together with the observed page set.
    pub fn source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Host hook: a full build is starting; forget the previous cycle.
    pub fn begin_build(&mut self) {
        self.session.reset();
    }

    /// Host hook: a page is about to build; record it when it is
    /// notebook-powered.
    pub fn observe_page(&mut self, contents_file: &Path) {
        if notebook_for_page(contents_file).is_some() {
            self.session.observe_page(contents_file.to_path_buf());
        }
    }

    /// Pages observed as notebook-powered this cycle.
    pub fn pages(&self) -> &HashSet<PathBuf> {
        self.session.pages()
    }

    /// The configured notebook source URL, if any.
    pub fn source_url_ref(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    /// Host hook: build the page's notebook artifact if it has one.
    ///
    /// When the page is notebook-powered and its notebook has not been
    /// converted this cycle, converts the notebook with a fresh session
    /// and overwrites the sibling contents artifact. Returns the artifact
    /// path when a conversion happened. A failed conversion writes nothing
    /// and records nothing, so the next attempt starts clean.
    pub fn build_page(&mut self, contents_file: &Path) -> Result<Option<PathBuf>, BuildError> {
        let Some(notebook) = notebook_for_page(contents_file) else {
            return Ok(None);
        };
        if self.session.is_converted(&notebook) {
            tracing::debug!("{} already converted this build", notebook.display());
            return Ok(None);
        }

        let mut session = (self.new_session)();
        let markdown = self.converter.convert(&notebook, session.as_mut())?;

        let destination = contents_file.with_file_name(self.contents_name.as_str());
        fs::write(&destination, markdown).map_err(|source| BuildError::Write {
            path: destination.clone(),
            source,
        })?;
        tracing::debug!("{} -> {}", notebook.display(), destination.display());

        self.session.mark_converted(notebook);
        Ok(Some(destination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offprint_notebook::Output;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Session double that counts executed cells and replays one scripted
    /// output list for every cell.
    struct Counting {
        calls: Arc<AtomicUsize>,
        outputs: Vec<Output>,
    }

    impl CellExecutor for Counting {
        fn execute(
            &mut self,
            _source: &str,
        ) -> Result<Vec<Output>, offprint_convert::ExecuteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.outputs.clone())
        }
    }

    fn counting_factory(calls: Arc<AtomicUsize>, outputs: Vec<Output>) -> SessionFactory {
        Box::new(move || {
            Box::new(Counting {
                calls: Arc::clone(&calls),
                outputs: outputs.clone(),
            })
        })
    }

    const NOTEBOOK: &str = r##"{
        "cells": [
            {"cell_type": "markdown", "metadata": {}, "source": "# Post"},
            {"cell_type": "code", "metadata": {}, "outputs": [], "source": "x = 1"}
        ],
        "metadata": {}
    }"##;

    fn page_with_notebook(root: &Path, name: &str, notebook_json: &str) -> PathBuf {
        let page_dir = root.join(name);
        fs::create_dir(&page_dir).unwrap();
        fs::write(page_dir.join(format!("{name}.ipynb")), notebook_json).unwrap();
        let contents = page_dir.join("contents.lr");
        fs::write(&contents, "placeholder").unwrap();
        contents
    }

    #[test]
    fn builds_notebook_powered_page() {
        let dir = tempfile::tempdir().unwrap();
        let contents = page_with_notebook(dir.path(), "post", NOTEBOOK);

        let calls = Arc::new(AtomicUsize::new(0));
        let mut builder = NotebookBuilder::new(
            Converter::new(),
            counting_factory(Arc::clone(&calls), Vec::new()),
        );
        builder.begin_build();

        let built = builder.build_page(&contents).unwrap();

        assert_eq!(built, Some(contents.clone()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let written = fs::read_to_string(&contents).unwrap();
        assert_eq!(written, "# Post\n\n```python\nx = 1\n```\n");
    }

    #[test]
    fn converts_once_per_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let contents = page_with_notebook(dir.path(), "post", NOTEBOOK);

        let calls = Arc::new(AtomicUsize::new(0));
        let mut builder = NotebookBuilder::new(
            Converter::new(),
            counting_factory(Arc::clone(&calls), Vec::new()),
        );
        builder.begin_build();

        assert!(builder.build_page(&contents).unwrap().is_some());
        assert!(builder.build_page(&contents).unwrap().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn new_cycle_converts_again() {
        let dir = tempfile::tempdir().unwrap();
        let contents = page_with_notebook(dir.path(), "post", NOTEBOOK);

        let calls = Arc::new(AtomicUsize::new(0));
        let mut builder = NotebookBuilder::new(
            Converter::new(),
            counting_factory(Arc::clone(&calls), Vec::new()),
        );

        builder.begin_build();
        assert!(builder.build_page(&contents).unwrap().is_some());

        builder.begin_build();
        assert!(builder.build_page(&contents).unwrap().is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn plain_pages_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let page_dir = dir.path().join("plain");
        fs::create_dir(&page_dir).unwrap();
        let contents = page_dir.join("contents.lr");
        fs::write(&contents, "prose").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let mut builder = NotebookBuilder::new(
            Converter::new(),
            counting_factory(Arc::clone(&calls), Vec::new()),
        );
        builder.begin_build();

        assert!(builder.build_page(&contents).unwrap().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(fs::read_to_string(&contents).unwrap(), "prose");
    }

    #[test]
    fn failed_conversion_writes_and_records_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let contents = page_with_notebook(dir.path(), "post", NOTEBOOK);

        let calls = Arc::new(AtomicUsize::new(0));
        let error_output = Output::Error {
            ename: "RuntimeError".into(),
            evalue: "boom".into(),
            traceback: vec![],
        };
        let mut builder = NotebookBuilder::new(
            Converter::new(),
            counting_factory(Arc::clone(&calls), vec![error_output]),
        );
        builder.begin_build();

        assert!(builder.build_page(&contents).is_err());
        assert_eq!(fs::read_to_string(&contents).unwrap(), "placeholder");

        // Not recorded: the next attempt converts again rather than
        // silently skipping a notebook that never produced an artifact.
        assert!(builder.build_page(&contents).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn custom_contents_name_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let contents = page_with_notebook(dir.path(), "post", NOTEBOOK);

        let calls = Arc::new(AtomicUsize::new(0));
        let mut builder = NotebookBuilder::new(
            Converter::new(),
            counting_factory(Arc::clone(&calls), Vec::new()),
        )
        .contents_name("contents.md");
        builder.begin_build();

        let built = builder.build_page(&contents).unwrap().unwrap();

        assert_eq!(built, contents.with_file_name("contents.md"));
        assert!(built.is_file());
        // The original page file is left alone under a custom name.
        assert_eq!(fs::read_to_string(&contents).unwrap(), "placeholder");
    }

    #[test]
    fn observes_only_notebook_powered_pages() {
        let dir = tempfile::tempdir().unwrap();
        let powered = page_with_notebook(dir.path(), "post", NOTEBOOK);

        let plain_dir = dir.path().join("plain");
        fs::create_dir(&plain_dir).unwrap();
        let plain = plain_dir.join("contents.lr");
        fs::write(&plain, "prose").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let mut builder =
            NotebookBuilder::new(Converter::new(), counting_factory(calls, Vec::new()))
                .source_url("https://example.org/notebooks/");
        builder.begin_build();

        builder.observe_page(&powered);
        builder.observe_page(&plain);

        assert_eq!(builder.pages().len(), 1);
        assert!(builder.pages().contains(&powered));
        assert_eq!(builder.source_url_ref(), Some("https://example.org/notebooks/"));
    }
}
