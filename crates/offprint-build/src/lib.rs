//! Build-system integration for notebook-powered pages.
//!
//! A page is notebook-powered when a notebook named after the page's
//! directory sits beside its contents file. During a full site build each
//! such notebook is converted at most once, its Markdown overwriting the
//! contents artifact just before the host renders the page.

pub mod builder;
pub mod page;
pub mod session;

pub use builder::{BuildError, NotebookBuilder, SessionFactory, DEFAULT_CONTENTS_NAME};
pub use page::notebook_for_page;
pub use session::BuildSession;
