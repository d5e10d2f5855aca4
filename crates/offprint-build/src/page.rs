//! Notebook-powered page detection.

use std::path::{Path, PathBuf};

/// Locate the notebook backing a page, if any.
///
/// A page is notebook-powered when a notebook named after the page's
/// directory sits beside its contents file: `blog/entry/contents.lr` is
/// powered by `blog/entry/entry.ipynb`. Anything that fails the lookup (no
/// parent directory, a name that is not valid text, no such file) just
/// means the page is not notebook-powered.
pub fn notebook_for_page(contents_file: &Path) -> Option<PathBuf> {
    let dir = contents_file.parent()?;
    let name = dir.file_name()?.to_str()?;
    let candidate = dir.join(format!("{name}.ipynb"));
    candidate.is_file().then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_notebook_named_after_directory() {
        let dir = tempfile::tempdir().unwrap();
        let page_dir = dir.path().join("entry");
        fs::create_dir(&page_dir).unwrap();
        fs::write(page_dir.join("entry.ipynb"), "{}").unwrap();
        fs::write(page_dir.join("contents.lr"), "body").unwrap();

        let found = notebook_for_page(&page_dir.join("contents.lr"));
        assert_eq!(found, Some(page_dir.join("entry.ipynb")));
    }

    #[test]
    fn ignores_notebooks_with_other_names() {
        let dir = tempfile::tempdir().unwrap();
        let page_dir = dir.path().join("entry");
        fs::create_dir(&page_dir).unwrap();
        fs::write(page_dir.join("scratch.ipynb"), "{}").unwrap();
        fs::write(page_dir.join("contents.lr"), "body").unwrap();

        assert_eq!(notebook_for_page(&page_dir.join("contents.lr")), None);
    }

    #[test]
    fn plain_pages_are_not_powered() {
        let dir = tempfile::tempdir().unwrap();
        let page_dir = dir.path().join("entry");
        fs::create_dir(&page_dir).unwrap();
        fs::write(page_dir.join("contents.lr"), "body").unwrap();

        assert_eq!(notebook_for_page(&page_dir.join("contents.lr")), None);
    }

    #[test]
    fn rootless_paths_are_not_powered() {
        assert_eq!(notebook_for_page(Path::new("contents.lr")), None);
    }
}
