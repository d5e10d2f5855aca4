//! CLI subcommand implementations.

pub mod build;
pub mod convert;

use std::path::Path;

use anyhow::{Context, Result};

use offprint_convert::{config, CommandExecutor, CommandFormatter, Converter, OptionMap};

/// Load the settings layer named on the command line, or an empty one.
pub fn settings_layer(settings: Option<&Path>) -> Result<OptionMap> {
    match settings {
        Some(path) => config::load_settings(path)
            .with_context(|| format!("failed to load settings from {}", path.display())),
        None => Ok(OptionMap::new()),
    }
}

/// Build the converter shared by both subcommands.
pub fn converter(layer: OptionMap, black: bool) -> Converter {
    let mut converter = Converter::with_settings(layer);
    if black {
        converter.set_formatter(Box::new(CommandFormatter::black()));
    }
    converter
}

/// An execution session for the given interpreter command line, e.g.
/// `python3` or `python3 -u`.
pub fn kernel_session(kernel: &str) -> CommandExecutor {
    let mut parts = kernel.split_whitespace();
    let mut session = CommandExecutor::new(parts.next().unwrap_or("python3"));
    for arg in parts {
        session = session.arg(arg);
    }
    session
}
