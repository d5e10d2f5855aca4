//! Code-cell preprocessing: load-directive expansion, inline overrides,
//! and best-effort source reformatting.

use std::fs;
use std::path::Path;

use serde_json::Value;

use offprint_notebook::CodeCell;

use crate::config::{CellConfig, OptionMap, Resolver};
use crate::error::ConvertError;
use crate::reformat::SourceFormatter;

/// Directive marking a cell whose real source lives in an external file.
const LOAD_DIRECTIVE: &str = "%load";

/// Prepare one code cell for execution and rendering.
///
/// Trims the source, expands a leading load directive (resolving its
/// target against `notebook_dir`), merges an inline override mapping into
/// the cell-level metadata, and reformats the source when the resolved
/// configuration and the notebook language ask for it. Returns the
/// effective configuration for the cell, inline override included.
///
/// An empty cell is a no-op: nothing to expand, execute, or reformat.
pub fn preprocess(
    cell: &mut CodeCell,
    notebook_dir: &Path,
    language: &str,
    resolver: &Resolver,
    notebook_override: Option<&OptionMap>,
    formatter: Option<&dyn SourceFormatter>,
) -> Result<CellConfig, ConvertError> {
    cell.source = cell.source.trim().to_string();
    if cell.source.is_empty() {
        return Ok(resolver.resolve(notebook_override, cell.override_map(), None));
    }

    let mut inline = None;
    if let Some(directive) = parse_directive(&cell.source) {
        let path = notebook_dir.join(&directive.target);
        let loaded = fs::read_to_string(&path).map_err(|source| ConvertError::LoadDirective {
            path: path.clone(),
            source,
        })?;
        tracing::debug!("expanded load directive: {} ({} bytes)", path.display(), loaded.len());

        if let Some(map) = &directive.inline {
            cell.override_map_mut().extend(map.clone());
        }
        cell.source = loaded;
        inline = directive.inline;
    }

    let config = resolver.resolve(notebook_override, cell.override_map(), inline.as_ref());

    if config.blackify() {
        if let Some(formatter) = formatter.filter(|f| f.language() == language) {
            match formatter.reformat(&cell.source) {
                Ok(formatted) => cell.source = formatted,
                Err(err) => tracing::debug!("keeping unformatted source: {err}"),
            }
        }
    }

    Ok(config)
}

struct Directive {
    target: String,
    inline: Option<OptionMap>,
}

/// Recognize a load directive at the head of a cell.
///
/// The first line may be commented out (running a directive in the
/// interactive shell rewrites it as `# %load …`), so leading comment
/// markers are stripped before matching. The line after the directive may
/// carry an inline override mapping.
fn parse_directive(source: &str) -> Option<Directive> {
    let mut lines = source.lines();
    let target = load_target(lines.next()?)?;
    let inline = lines.next().and_then(parse_inline_override);
    Some(Directive {
        target: target.to_string(),
        inline,
    })
}

/// The file named by a load directive on the given line, if any.
fn load_target(first_line: &str) -> Option<&str> {
    let line = first_line.trim_start().trim_start_matches('#').trim_start();
    let rest = line.strip_prefix(LOAD_DIRECTIVE)?;
    if !rest.starts_with(char::is_whitespace) {
        // A different magic, e.g. `%load_ext`.
        return None;
    }
    let target = rest.trim();
    (!target.is_empty()).then_some(target)
}

/// Parse the inline override following a directive: a single-line JSON
/// object of option values. Anything else is logged and skipped; an
/// override must never make a cell fail.
fn parse_inline_override(line: &str) -> Option<OptionMap> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(map)) => Some(map),
        Ok(other) => {
            tracing::debug!("inline override is not a mapping, ignoring: {other}");
            None
        }
        Err(err) => {
            tracing::debug!("ignoring malformed inline override {line:?}: {err}");
            None
        }
    }
}
