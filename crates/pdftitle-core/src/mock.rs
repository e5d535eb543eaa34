//! Mock layout backend for testing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::backend::{BackendError, PageLayout, PdfBackend};

/// A configurable mock response for [`MockBackend`].
#[derive(Clone, Debug)]
pub enum MockPage {
    /// Return this layout.
    Layout(PageLayout),
    /// Simulate a file that is not a readable PDF.
    Unreadable,
    /// Simulate a document with zero pages.
    Empty,
}

/// A hand-rolled mock implementing [`PdfBackend`] for tests.
///
/// Pages are keyed by file name (not full path) so tests can point it at
/// temporary directories. Unknown files behave like [`MockPage::Unreadable`].
#[derive(Default)]
pub struct MockBackend {
    pages: HashMap<PathBuf, MockPage>,
    call_count: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, file_name: impl Into<PathBuf>, page: MockPage) -> Self {
        self.pages.insert(file_name.into(), page);
        self
    }

    pub fn with_layout(self, file_name: impl Into<PathBuf>, layout: PageLayout) -> Self {
        self.with_page(file_name, MockPage::Layout(layout))
    }

    /// How many times `first_page_layout()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl PdfBackend for MockBackend {
    fn first_page_layout(&self, path: &Path) -> Result<PageLayout, BackendError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let key = path.file_name().map(PathBuf::from).unwrap_or_default();
        match self.pages.get(&key) {
            Some(MockPage::Layout(layout)) => Ok(layout.clone()),
            Some(MockPage::Empty) => Err(BackendError::PageAccess(format!(
                "{}: document has no pages",
                path.display()
            ))),
            Some(MockPage::Unreadable) | None => Err(BackendError::DocumentOpen(format!(
                "{}: not a PDF",
                path.display()
            ))),
        }
    }
}
