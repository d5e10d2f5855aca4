//! The conversion driver: notebook file in, Markdown text out.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use minijinja::Environment;

use offprint_notebook::{export, Cell, Notebook};

use crate::config::{OptionMap, Resolver};
use crate::error::ConvertError;
use crate::exec::CellExecutor;
use crate::preprocess::preprocess;
use crate::reformat::SourceFormatter;
use crate::render::render_cell;

/// Converts executed notebooks into Markdown documents.
///
/// The converter owns everything that is constant across notebooks: the
/// defaults-plus-settings option layers, the optional source formatter,
/// and the template engine. Execution state lives in the session passed
/// to each [`convert`](Converter::convert) call.
pub struct Converter {
    resolver: Resolver,
    formatter: Option<Box<dyn SourceFormatter>>,
    templates: Environment<'static>,
}

impl Converter {
    /// Converter over the built-in defaults alone.
    pub fn new() -> Self {
        Self::with_settings(OptionMap::new())
    }

    /// Converter with a settings layer above the defaults (see
    /// [`crate::config::load_settings`]).
    pub fn with_settings(settings: OptionMap) -> Self {
        Self {
            resolver: Resolver::with_settings(settings),
            formatter: None,
            templates: Environment::new(),
        }
    }

    /// Attach a source formatter, applied to cells whose resolved
    /// `blackify` option is on when the notebook language matches.
    pub fn set_formatter(&mut self, formatter: Box<dyn SourceFormatter>) {
        self.formatter = Some(formatter);
    }

    /// Convert the notebook at `path`, running code cells through
    /// `session`, and return the Markdown document.
    ///
    /// The session is exclusive to this notebook for the duration of the
    /// call. Cells run strictly in document order, so later cells may use
    /// interpreter state established by earlier ones. Any error leaves the
    /// session behind; callers discard it and start the next notebook with
    /// a fresh one.
    pub fn convert(
        &self,
        path: &Path,
        session: &mut dyn CellExecutor,
    ) -> Result<String, ConvertError> {
        let raw = fs::read_to_string(path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => ConvertError::NotFound {
                path: path.to_path_buf(),
            },
            _ => ConvertError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        tracing::info!("converting {} to markdown", path.display());

        let mut notebook = Notebook::parse(&raw)?;
        let notebook_dir = match path.parent() {
            Some(parent) if parent != Path::new("") => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        // Cells read their data files relative to the notebook, so the
        // notebook directory becomes the working directory while its cells
        // run. The guard restores the previous directory on every exit
        // path, including errors.
        let _workdir = Workdir::enter(&notebook_dir).map_err(|source| ConvertError::Io {
            path: notebook_dir.clone(),
            source,
        })?;

        let language = notebook.language_or_default().to_string();
        let notebook_override = notebook.override_map().cloned();

        for cell in &mut notebook.cells {
            let Cell::Code(code) = &mut *cell else { continue };

            let config = preprocess(
                code,
                &notebook_dir,
                &language,
                &self.resolver,
                notebook_override.as_ref(),
                self.formatter.as_deref(),
            )?;

            let outputs = if config.execute() {
                session.execute(&code.source)?
            } else {
                tracing::debug!("execution disabled for cell, using stored outputs");
                std::mem::take(&mut code.outputs)
            };

            let rendered = render_cell(&self.templates, &language, &code.source, &outputs, &config)?;
            *cell = Cell::raw(rendered);
        }

        Ok(export::to_markdown(&notebook))
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

/// The working directory is process-global state, so conversions serialize
/// on this lock for the window in which they move it.
static CWD_LOCK: Mutex<()> = Mutex::new(());

/// Scoped working-directory change, restored on drop.
struct Workdir {
    previous: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl Workdir {
    fn enter(dir: &Path) -> std::io::Result<Self> {
        let lock = CWD_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = env::current_dir()?;
        env::set_current_dir(dir)?;
        Ok(Self {
            previous,
            _lock: lock,
        })
    }
}

impl Drop for Workdir {
    fn drop(&mut self) {
        if let Err(err) = env::set_current_dir(&self.previous) {
            tracing::warn!(
                "failed to restore working directory to {}: {err}",
                self.previous.display()
            );
        }
    }
}
