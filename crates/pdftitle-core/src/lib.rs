use serde::{Deserialize, Serialize};

pub mod backend;
pub mod bibtex;
pub mod config_file;
pub mod heuristic;
pub mod lines;
pub mod matching;
pub mod mock;
pub mod records;

// Re-export for convenience
pub use backend::{BackendError, PageLayout, PdfBackend, RawBlock, RawLine, RawSpan};
pub use bibtex::{BibtexEntry, cite_key};
pub use heuristic::{HeuristicConfig, select_title_candidate};
pub use lines::{extract_first_page_lines, extract_lines};
pub use matching::{is_line_in_title, normalize_whitespace, squash};
pub use records::{GoldPaperRecord, RecordError, TrainingRow, load_title_map};

/// Classification of a single line on the first page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LineLabel {
    Title,
    Other,
}

impl LineLabel {
    pub fn is_title(self) -> bool {
        self == LineLabel::Title
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LineLabel::Title => "TITLE",
            LineLabel::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for LineLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One visually distinct line of text on a page, with the geometric and
/// typographic features the classifier consumes.
///
/// `line_index` is the position among emitted lines of the same page and is
/// fixed at creation. `y_position` is the top edge divided by page height and
/// is *not* clamped: content outside the nominal page box can fall outside
/// `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfTextLine {
    pub text: String,
    pub page_number: u32,
    pub line_index: usize,
    pub y_position: f64,
    pub font_size: f64,
    pub is_bold: bool,
    pub label: Option<LineLabel>,
}

impl PdfTextLine {
    /// Assign a label, consuming the unlabeled line.
    pub fn with_label(mut self, label: LineLabel) -> Self {
        self.label = Some(label);
        self
    }

    /// Label this line against a known title using [`is_line_in_title`].
    pub fn labeled_against(self, true_title: &str) -> Self {
        let label = if is_line_in_title(&self.text, true_title) {
            LineLabel::Title
        } else {
            LineLabel::Other
        };
        self.with_label(label)
    }
}
