//! Content-tree build: convert every notebook-powered page.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use walkdir::WalkDir;

use offprint_build::{notebook_for_page, NotebookBuilder, SessionFactory};

use super::{converter, kernel_session, settings_layer};

pub fn run(
    root: PathBuf,
    settings: Option<PathBuf>,
    kernel: String,
    black: bool,
    contents_name: String,
    source_url: Option<String>,
) -> Result<()> {
    let start = Instant::now();

    let layer = settings_layer(settings.as_deref())?;
    let factory: SessionFactory = Box::new(move || Box::new(kernel_session(&kernel)));

    let mut builder = NotebookBuilder::new(converter(layer, black), factory)
        .contents_name(contents_name.clone());
    if let Some(url) = source_url {
        builder = builder.source_url(url);
    }

    builder.begin_build();

    let mut converted = 0usize;
    for entry in WalkDir::new(&root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
    {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("ipynb") {
            continue;
        }
        let Some(dir) = path.parent() else { continue };

        // Only notebooks named after their directory power a page.
        let contents = dir.join(&contents_name);
        if notebook_for_page(&contents).as_deref() != Some(path) {
            continue;
        }

        builder.observe_page(&contents);
        let built = builder
            .build_page(&contents)
            .with_context(|| format!("failed to build page for {}", path.display()))?;
        if built.is_some() {
            converted += 1;
        }
    }

    tracing::info!(
        "converted {converted} notebook page(s) in {}ms",
        start.elapsed().as_millis()
    );
    if let Some(url) = builder.source_url_ref() {
        tracing::debug!(
            "{} page(s) will link notebook sources under {url}",
            builder.pages().len()
        );
    }

    Ok(())
}
