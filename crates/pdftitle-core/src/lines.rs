//! Geometric line extraction: page layout tree → ordered [`PdfTextLine`]s.

use std::path::Path;

use crate::backend::{BackendError, PageLayout, PdfBackend, RawLine};
use crate::matching::normalize_whitespace;
use crate::PdfTextLine;

/// Open `path` through `backend` and extract the lines of page 0.
pub fn extract_first_page_lines(
    path: &Path,
    backend: &dyn PdfBackend,
) -> Result<Vec<PdfTextLine>, BackendError> {
    let layout = backend.first_page_layout(path)?;
    let lines = extract_lines(&layout)?;
    tracing::debug!(path = %path.display(), lines = lines.len(), "extracted first-page lines");
    Ok(lines)
}

/// Flatten a page layout into text lines in block order.
///
/// Blocks without lines are skipped, as are lines whose joined span text is
/// blank. `line_index` counts emitted lines only. Spans missing a size, flags
/// or bounding box contribute `0.0`, "not bold" and a zero box respectively,
/// so one malformed span never drops the rest of the page.
pub fn extract_lines(layout: &PageLayout) -> Result<Vec<PdfTextLine>, BackendError> {
    if layout.height.is_nan() || layout.height <= 0.0 {
        return Err(BackendError::PageAccess(format!(
            "page has invalid height {}",
            layout.height
        )));
    }

    let mut lines = Vec::new();
    for block in &layout.blocks {
        let Some(raw_lines) = &block.lines else {
            continue;
        };
        for raw in raw_lines {
            if let Some(line) = build_line(raw, lines.len(), layout.height) {
                lines.push(line);
            }
        }
    }
    Ok(lines)
}

fn build_line(raw: &RawLine, line_index: usize, page_height: f64) -> Option<PdfTextLine> {
    let joined = raw
        .spans
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let text = normalize_whitespace(&joined);
    if text.is_empty() {
        return None;
    }

    let font_size = raw
        .spans
        .iter()
        .map(|s| s.size_or_zero())
        .fold(0.0_f64, f64::max);
    let is_bold = raw.spans.iter().any(|s| s.is_bold());
    // Blank text already ruled out an empty span list.
    let top = raw.spans.first().map(|s| s.top()).unwrap_or(0.0);

    Some(PdfTextLine {
        text,
        page_number: 0,
        line_index,
        y_position: top / page_height,
        font_size,
        is_bold,
        label: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BOLD_FLAG, RawBlock, RawSpan};

    fn layout(blocks: Vec<RawBlock>) -> PageLayout {
        PageLayout {
            width: 612.0,
            height: 800.0,
            blocks,
        }
    }

    #[test]
    fn joins_spans_and_takes_max_size() {
        let page = layout(vec![RawBlock::text(vec![RawLine::new(vec![
            RawSpan::new("Deep", 14.0, 0, [50.0, 80.0, 90.0, 96.0]),
            RawSpan::new("Learning", 17.5, BOLD_FLAG, [95.0, 82.0, 160.0, 96.0]),
        ])])]);

        let lines = extract_lines(&page).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Deep Learning");
        assert_eq!(lines[0].font_size, 17.5);
        assert!(lines[0].is_bold);
        // first span's top, not the line minimum
        assert!((lines[0].y_position - 0.1).abs() < 1e-9);
        assert_eq!(lines[0].page_number, 0);
        assert!(lines[0].label.is_none());
    }

    #[test]
    fn skips_image_blocks_and_blank_lines() {
        let page = layout(vec![
            RawBlock::image(),
            RawBlock::text(vec![
                RawLine::new(vec![RawSpan::new("   ", 10.0, 0, [0.0; 4])]),
                RawLine::new(vec![]),
                RawLine::new(vec![RawSpan::new("Abstract", 10.0, 0, [0.0, 400.0, 0.0, 0.0])]),
            ]),
            RawBlock::text(vec![RawLine::new(vec![RawSpan::new(
                "1 Introduction",
                12.0,
                0,
                [0.0, 500.0, 0.0, 0.0],
            )])]),
        ]);

        let lines = extract_lines(&page).unwrap();
        let indices: Vec<usize> = lines.iter().map(|l| l.line_index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(lines[0].text, "Abstract");
        assert_eq!(lines[1].text, "1 Introduction");
    }

    #[test]
    fn collapses_internal_whitespace() {
        let page = layout(vec![RawBlock::text(vec![RawLine::new(vec![
            RawSpan::new("  Graph \t", 12.0, 0, [0.0; 4]),
            RawSpan::new(" Networks  ", 12.0, 0, [0.0; 4]),
        ])])]);
        let lines = extract_lines(&page).unwrap();
        assert_eq!(lines[0].text, "Graph Networks");
    }

    #[test]
    fn malformed_span_defaults_do_not_abort() {
        let page = layout(vec![RawBlock::text(vec![
            RawLine::new(vec![RawSpan {
                text: "no metadata".into(),
                ..Default::default()
            }]),
            RawLine::new(vec![RawSpan::new("fine", 9.0, 0, [0.0, 160.0, 0.0, 0.0])]),
        ])]);

        let lines = extract_lines(&page).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].font_size, 0.0);
        assert_eq!(lines[0].y_position, 0.0);
        assert!(!lines[0].is_bold);
        assert!((lines[1].y_position - 0.2).abs() < 1e-9);
    }

    #[test]
    fn y_position_is_not_clamped() {
        let page = layout(vec![RawBlock::text(vec![RawLine::new(vec![RawSpan::new(
            "overflow",
            8.0,
            0,
            [0.0, 880.0, 0.0, 0.0],
        )])])]);
        let lines = extract_lines(&page).unwrap();
        assert!(lines[0].y_position > 1.0);
    }

    #[test]
    fn zero_height_page_is_rejected() {
        let page = PageLayout::default();
        assert!(matches!(
            extract_lines(&page),
            Err(BackendError::PageAccess(_))
        ));
    }

    #[test]
    fn nan_height_page_is_rejected() {
        let page = PageLayout {
            height: f64::NAN,
            ..PageLayout::default()
        };
        assert!(matches!(
            extract_lines(&page),
            Err(BackendError::PageAccess(_))
        ));
    }
}
