//! Notebook file parsing and Markdown export.
//!
//! A small model of the notebook JSON format: enough structure to walk
//! cells and output records, mutate cells during conversion, and assemble
//! the final Markdown document. Everything not modeled rides along in
//! flattened metadata maps.

pub mod export;
pub mod ipynb;

pub use export::to_markdown;
pub use ipynb::{
    plain_text, Cell, CodeCell, JsonMap, KernelSpec, LanguageInfo, MarkdownCell, Notebook,
    NotebookError, Output, RawCell, DEFAULT_LANGUAGE, OVERRIDE_KEY,
};
