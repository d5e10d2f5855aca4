//! Errors that abort a notebook conversion.

use std::path::PathBuf;

/// Conversion failure. Everything here aborts the notebook being
/// converted; recoverable conditions (a formatter failure, a malformed
/// inline override) are logged where they happen and never reach this
/// type.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The given path does not name a readable notebook file.
    #[error("Notebook not found: {path}")]
    NotFound { path: PathBuf },

    /// The file exists but is not valid notebook JSON.
    #[error("Failed to parse notebook: {0}")]
    Notebook(#[from] offprint_notebook::NotebookError),

    /// The settings file could not be read or parsed.
    #[error("Failed to load settings: {0}")]
    Settings(#[from] config::ConfigError),

    /// A load directive named a file that could not be read.
    #[error("Failed to load {path}: {source}")]
    LoadDirective {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A cell produced an error output while `allow_errors` is off.
    #[error("Cell raised {ename}: {evalue}, and errors are not allowed")]
    ErrorsNotAllowed { ename: String, evalue: String },

    /// An output record of a kind the renderer has no fragment for.
    #[error("Unhandled output type {kind:?} in cell:\n{cell_source}")]
    UnhandledOutput { kind: String, cell_source: String },

    /// A fragment template failed to render.
    #[error("Template render failed: {0}")]
    Template(#[from] minijinja::Error),

    /// The execution session failed to run a cell.
    #[error("Execution failed: {0}")]
    Execute(#[from] crate::exec::ExecuteError),

    /// Filesystem failure outside the specific cases above.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
