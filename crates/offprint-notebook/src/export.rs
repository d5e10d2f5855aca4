//! Markdown assembly for converted notebooks.

use crate::ipynb::{Cell, Notebook};

/// Render a notebook to Markdown text.
///
/// Markdown and raw cell sources pass through verbatim. Code cells still
/// present are rendered as fenced blocks in the notebook's language (the
/// conversion pipeline replaces executed code cells with raw cells before
/// exporting, so this is the unexecuted fallback). Non-empty fragments are
/// separated by one blank line and the document ends with a newline.
pub fn to_markdown(notebook: &Notebook) -> String {
    let language = notebook.language_or_default();

    let mut fragments: Vec<String> = Vec::new();
    for cell in &notebook.cells {
        let fragment = match cell {
            Cell::Markdown(cell) => cell.source.clone(),
            Cell::Raw(cell) => cell.source.clone(),
            Cell::Code(cell) => format!("```{language}\n{}\n```", cell.source),
        };
        if !fragment.is_empty() {
            fragments.push(fragment);
        }
    }

    let mut document = fragments.join("\n\n");
    if !document.is_empty() {
        document.push('\n');
    }
    document
}
