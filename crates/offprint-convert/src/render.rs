//! Rendering executed cells into Markdown fragments.
//!
//! Each fragment comes from a configurable template, so a site can restyle
//! how sources and outputs appear without touching the pipeline. Templates
//! are rendered from their option strings on every use; they are tiny, and
//! any layer may swap them per cell.

use minijinja::{context, Environment};

use offprint_notebook::{plain_text, Output};

use crate::config::CellConfig;
use crate::error::ConvertError;

/// Render one executed cell: the source fragment, then one fragment per
/// output record, joined by blank lines.
pub fn render_cell(
    env: &Environment<'_>,
    language: &str,
    source: &str,
    outputs: &[Output],
    config: &CellConfig,
) -> Result<String, ConvertError> {
    let mut fragments = vec![env.render_str(config.source_template(), context! { language, source })?];

    for output in outputs {
        fragments.push(render_output(env, output, source, config)?);
    }

    Ok(fragments.join("\n\n"))
}

fn render_output(
    env: &Environment<'_>,
    output: &Output,
    cell_source: &str,
    config: &CellConfig,
) -> Result<String, ConvertError> {
    match output {
        Output::ExecuteResult { data, .. } => {
            let data = plain_text(data).unwrap_or_else(|| {
                tracing::debug!("execute result without a text/plain representation");
                String::new()
            });
            Ok(env.render_str(config.execute_result_template(), context! { data })?)
        }

        Output::Stream { name, text } => {
            Ok(env.render_str(config.stream_template(), context! { name, text })?)
        }

        Output::Error {
            ename,
            evalue,
            traceback,
        } => {
            if !config.allow_errors() {
                return Err(ConvertError::ErrorsNotAllowed {
                    ename: ename.clone(),
                    evalue: evalue.clone(),
                });
            }
            if config.full_traceback() {
                Ok(traceback.join("\n"))
            } else {
                Ok(env.render_str(
                    config.exception_template(),
                    context! { ename, evalue, traceback },
                )?)
            }
        }

        Output::Other(_) => Err(ConvertError::UnhandledOutput {
            kind: output.other_kind().unwrap_or("unknown").to_string(),
            cell_source: cell_source.to_string(),
        }),
    }
}
