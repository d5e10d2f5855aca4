//! Executed-notebook to Markdown conversion.
//!
//! The driver reads a notebook, preprocesses each code cell (trimming,
//! load-directive expansion, optional reformatting), runs it through an
//! injected execution session, renders the source and outputs through
//! configurable Markdown fragment templates, and assembles the final
//! document. Options merge from five layers, from built-in defaults down
//! to a per-cell inline override.

pub mod config;
pub mod convert;
pub mod error;
pub mod exec;
pub mod preprocess;
pub mod reformat;
pub mod render;

pub use config::{load_settings, CellConfig, OptionMap, Resolver};
pub use convert::Converter;
pub use error::ConvertError;
pub use exec::{CellExecutor, CommandExecutor, ExecuteError};
pub use reformat::{CommandFormatter, ReformatError, SourceFormatter};
