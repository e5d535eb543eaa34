use std::path::Path;

use thiserror::Error;

/// Span style-flag bit marking bold text.
pub const BOLD_FLAG: u32 = 16;
/// Span style-flag bit marking italic text.
pub const ITALIC_FLAG: u32 = 2;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    DocumentOpen(String),
    #[error("failed to access first page: {0}")]
    PageAccess(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Structured content of a single page: blocks → lines → spans.
///
/// Coordinates are in page units with the origin at the top-left corner,
/// so a smaller `y` is higher on the page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub width: f64,
    pub height: f64,
    pub blocks: Vec<RawBlock>,
}

/// A block of page content. Non-text blocks (images, vector art) carry no
/// `lines` and are ignored by line extraction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawBlock {
    pub lines: Option<Vec<RawLine>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawLine {
    pub spans: Vec<RawSpan>,
}

/// The smallest styled run of text. Every attribute except the text may be
/// missing when the producer could not determine it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSpan {
    pub text: String,
    pub size: Option<f64>,
    pub flags: Option<u32>,
    /// `[x0, y0, x1, y1]`
    pub bbox: Option<[f64; 4]>,
}

impl RawBlock {
    pub fn text(lines: Vec<RawLine>) -> Self {
        Self { lines: Some(lines) }
    }

    pub fn image() -> Self {
        Self { lines: None }
    }
}

impl RawLine {
    pub fn new(spans: Vec<RawSpan>) -> Self {
        Self { spans }
    }
}

impl RawSpan {
    pub fn new(text: impl Into<String>, size: f64, flags: u32, bbox: [f64; 4]) -> Self {
        Self {
            text: text.into(),
            size: Some(size),
            flags: Some(flags),
            bbox: Some(bbox),
        }
    }

    pub fn size_or_zero(&self) -> f64 {
        self.size.unwrap_or(0.0)
    }

    pub fn is_bold(&self) -> bool {
        self.flags.unwrap_or(0) & BOLD_FLAG != 0
    }

    pub fn top(&self) -> f64 {
        self.bbox.unwrap_or([0.0; 4])[1]
    }
}

/// Trait for PDF layout backends.
///
/// Implementors open the document, read page 0 and hand back its layout
/// tree; turning that tree into [`crate::PdfTextLine`]s lives in
/// [`crate::lines`]. The document must be closed before this returns, on
/// success and on every error path.
pub trait PdfBackend: Send + Sync {
    /// Read the structured layout of the first page of a PDF file.
    fn first_page_layout(&self, path: &Path) -> Result<PageLayout, BackendError>;
}
