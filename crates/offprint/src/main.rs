//! Offprint CLI - execute notebooks and render them as Markdown pages.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "offprint")]
#[command(about = "Execute notebooks and render them as Markdown pages")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// INI file with conversion settings
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Interpreter command cells are piped through
    #[arg(short, long, default_value = "python3")]
    kernel: String,

    /// Reformat cell sources with black before rendering
    #[arg(long)]
    black: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one notebook to Markdown
    Convert {
        /// Notebook file to convert
        notebook: PathBuf,

        /// Render stored outputs instead of executing
        #[arg(long)]
        no_execute: bool,

        /// Write the Markdown here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert every notebook-powered page under a content tree
    Build {
        /// Content root to scan
        #[arg(default_value = ".")]
        root: PathBuf,

        /// Artifact name written beside each notebook
        #[arg(long, default_value = offprint_build::DEFAULT_CONTENTS_NAME)]
        contents_name: String,

        /// Public URL prefix where notebook sources are published
        #[arg(long)]
        source_url: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    // Execute command
    match cli.command {
        Commands::Convert {
            notebook,
            no_execute,
            output,
        } => {
            commands::convert::run(
                notebook,
                cli.settings,
                &cli.kernel,
                cli.black,
                no_execute,
                output,
            )?;
        }
        Commands::Build {
            root,
            contents_name,
            source_url,
        } => {
            commands::build::run(
                root,
                cli.settings,
                cli.kernel,
                cli.black,
                contents_name,
                source_url,
            )?;
        }
    }

    Ok(())
}
