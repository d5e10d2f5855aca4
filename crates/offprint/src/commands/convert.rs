//! Single-notebook conversion.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::Value;

use offprint_convert::config;

use super::{converter, kernel_session, settings_layer};

pub fn run(
    notebook: PathBuf,
    settings: Option<PathBuf>,
    kernel: &str,
    black: bool,
    no_execute: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut layer = settings_layer(settings.as_deref())?;
    if no_execute {
        // A settings-level override; notebook or cell metadata saying
        // otherwise still wins, like any higher layer.
        layer.insert(config::EXECUTE.to_string(), Value::Bool(false));
    }

    let converter = converter(layer, black);
    let mut session = kernel_session(kernel);
    let markdown = converter.convert(&notebook, &mut session)?;

    match output {
        Some(path) => {
            fs::write(&path, markdown)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!("wrote {}", path.display());
        }
        None => print!("{markdown}"),
    }

    Ok(())
}
