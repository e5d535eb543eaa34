use std::path::Path;

use mupdf::{Document, TextPageFlags};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use pdftitle_core::backend::BOLD_FLAG;
use pdftitle_core::{BackendError, PageLayout, PdfBackend, RawBlock, RawLine, RawSpan};

/// MuPDF-based implementation of [`PdfBackend`].
///
/// This crate is the sole AGPL island: it isolates the mupdf dependency
/// (which is AGPL-3.0) so that the rest of the workspace does not
/// transitively depend on it.
///
/// Geometry and font sizes come from walking the structured-text page
/// (blocks → lines → chars), which reports them as exact floats. MuPDF's
/// text iterators carry no font identity, so bold is read from the
/// `<font name=…>` runs of the same page's XML rendering and OR-ed per line.
#[derive(Debug, Default, Clone, Copy)]
pub struct MupdfBackend;

impl MupdfBackend {
    pub fn new() -> Self {
        Self
    }
}

/// One structured-text line as read from MuPDF, before style is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct LineGlyphs {
    pub text: String,
    /// Largest glyph size on the line, `None` for a line without glyphs.
    pub max_size: Option<f32>,
    /// Top edge of the first glyph.
    pub top: f32,
    /// `[x0, y0, x1, y1]` of the whole line.
    pub bounds: [f32; 4],
}

impl PdfBackend for MupdfBackend {
    fn first_page_layout(&self, path: &Path) -> Result<PageLayout, BackendError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::DocumentOpen("invalid path encoding".into()))?;

        // Dropped at the end of this scope on every path, closing the file.
        let document =
            Document::open(path_str).map_err(|e| BackendError::DocumentOpen(e.to_string()))?;

        let page_count = document
            .page_count()
            .map_err(|e| BackendError::PageAccess(e.to_string()))?;
        if page_count < 1 {
            return Err(BackendError::PageAccess("document has no pages".into()));
        }

        let page = document
            .load_page(0)
            .map_err(|e| BackendError::PageAccess(e.to_string()))?;
        let bounds = page
            .bounds()
            .map_err(|e| BackendError::PageAccess(e.to_string()))?;
        let text_page = page
            .to_text_page(TextPageFlags::empty())
            .map_err(|e| BackendError::PageAccess(e.to_string()))?;

        let mut blocks = Vec::new();
        for block in text_page.blocks() {
            let mut lines = Vec::new();
            for line in block.lines() {
                let line_bounds = line.bounds();
                let mut text = String::new();
                let mut max_size: Option<f32> = None;
                let mut top: Option<f32> = None;
                for c in line.chars() {
                    text.push(c.char().unwrap_or('\u{FFFD}'));
                    let size = c.size();
                    max_size = Some(max_size.map_or(size, |m| m.max(size)));
                    if top.is_none() {
                        let quad = c.quad();
                        top = Some(quad.ul.y.min(quad.ur.y));
                    }
                }
                lines.push(LineGlyphs {
                    text,
                    max_size,
                    top: top.unwrap_or(line_bounds.y0) - bounds.y0,
                    bounds: [
                        line_bounds.x0,
                        line_bounds.y0 - bounds.y0,
                        line_bounds.x1,
                        line_bounds.y1 - bounds.y0,
                    ],
                });
            }
            blocks.push(lines);
        }

        let xml = text_page
            .to_xml()
            .map_err(|e| BackendError::PageAccess(e.to_string()))?;
        let bold = bold_lines_from_xml(&xml)?;

        Ok(assemble_layout(
            f64::from(bounds.x1 - bounds.x0),
            f64::from(bounds.y1 - bounds.y0),
            blocks,
            &bold,
        ))
    }
}

/// Whether a PDF font name denotes a bold face.
///
/// Subset tags (`ABCDEF+`) are ignored. Besides explicit weight words this
/// recognizes the Computer Modern bold-extended families used by LaTeX.
pub fn is_bold_font_name(name: &str) -> bool {
    let base = name.split_once('+').map_or(name, |(_, rest)| rest);
    let lower = base.to_ascii_lowercase();
    ["bold", "black", "heavy", "demi"]
        .iter()
        .any(|w| lower.contains(w))
        || ["cmbx", "cmssbx", "cmbsy", "lmroman10-bold"]
            .iter()
            .any(|p| lower.starts_with(p))
}

fn font_is_bold(e: &BytesStart<'_>) -> bool {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == b"name")
        .is_some_and(|attr| is_bold_font_name(&String::from_utf8_lossy(&attr.value)))
}

/// One flag per `<line>` of MuPDF's structured-text XML, in document order:
/// true when any `<font>` run inside the line is bold.
pub fn bold_lines_from_xml(xml: &str) -> Result<Vec<bool>, BackendError> {
    let mut reader = Reader::from_str(xml);
    let mut lines: Vec<bool> = Vec::new();
    let mut in_line = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"line" => {
                    lines.push(false);
                    in_line = true;
                }
                b"font" if in_line && font_is_bold(e) => {
                    if let Some(last) = lines.last_mut() {
                        *last = true;
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) if e.name().as_ref() == b"line" => lines.push(false),
            Ok(Event::End(ref e)) if e.name().as_ref() == b"line" => in_line = false,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(BackendError::PageAccess(format!(
                    "unreadable structured text at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
        }
    }
    Ok(lines)
}

/// Build the backend-neutral layout from walked lines and per-line bold
/// flags. Each MuPDF line becomes one span.
///
/// When the XML line count disagrees with the walked lines the flags cannot
/// be aligned, so every line is left not bold and a warning is logged.
pub fn assemble_layout(
    width: f64,
    height: f64,
    blocks: Vec<Vec<LineGlyphs>>,
    bold: &[bool],
) -> PageLayout {
    let total: usize = blocks.iter().map(Vec::len).sum();
    let aligned = bold.len() == total;
    if !aligned {
        tracing::warn!(
            lines = total,
            xml_lines = bold.len(),
            "font runs do not line up with text lines, ignoring bold"
        );
    }

    let mut flags = bold.iter().copied();
    let blocks = blocks
        .into_iter()
        .map(|lines| {
            RawBlock::text(
                lines
                    .into_iter()
                    .map(|line| {
                        let is_bold = aligned && flags.next().unwrap_or(false);
                        RawLine::new(vec![RawSpan {
                            text: line.text,
                            size: line.max_size.map(f64::from),
                            flags: Some(if is_bold { BOLD_FLAG } else { 0 }),
                            bbox: Some([
                                f64::from(line.bounds[0]),
                                f64::from(line.top),
                                f64::from(line.bounds[2]),
                                f64::from(line.bounds[3]),
                            ]),
                        }])
                    })
                    .collect(),
            )
        })
        .collect();

    PageLayout {
        width,
        height,
        blocks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdftitle_core::{HeuristicConfig, extract_lines, select_title_candidate};

    /// Shape of `fz_print_stext_page_as_xml`: font runs split wherever the
    /// font or size changes, one `<char>` per glyph.
    const STEXT_XML: &str = r##"<page id="page1" width="612" height="792">
<block bbox="90.1 99.21 520.4 138.7">
<line bbox="90.1 99.21 520.4 117.8" wmode="0" dir="1 0">
<font name="PXHQLC+CMBX12" size="17.2154">
<char quad="90.1 99.21 101.3 99.21 90.1 117.8 101.3 117.8" x="90.1" y="113.5" color="#000000" c="S"/>
</font>
</line>
<line bbox="110.5 120.33 500.2 137.9" wmode="0" dir="1 0">
<font name="CMR12" size="12">
<char quad="110.5 120.33 116.2 120.33 110.5 137.9 116.2 137.9" x="110.5" y="134" color="#000000" c="a"/>
</font>
<font name="Times-Bold" size="12">
<char quad="116.2 120.33 122 120.33 116.2 137.9 122 137.9" x="116.2" y="134" color="#000000" c="&lt;"/>
</font>
</line>
</block>
<block bbox="72 300 540 312">
<line bbox="72 300 540 312" wmode="0" dir="1 0">
<font name="NimbusRomNo9L-Regu" size="10">
<char quad="72 300 77 300 72 312 77 312" x="72" y="310" color="#000000" c="b"/>
</font>
</line>
</block>
</page>
"##;

    fn glyphs(text: &str, max_size: f32, top: f32) -> LineGlyphs {
        LineGlyphs {
            text: text.to_string(),
            max_size: Some(max_size),
            top,
            bounds: [72.0, top, 540.0, top + max_size],
        }
    }

    #[test]
    fn bold_is_or_of_font_runs_per_line() {
        assert_eq!(bold_lines_from_xml(STEXT_XML).unwrap(), vec![true, true, false]);
    }

    #[test]
    fn bold_font_names() {
        assert!(is_bold_font_name("PXHQLC+CMBX12"));
        assert!(is_bold_font_name("Times-Bold"));
        assert!(is_bold_font_name("Helvetica-BoldOblique"));
        assert!(is_bold_font_name("MyriadPro-Semibold"));
        assert!(!is_bold_font_name("CMR10"));
        assert!(!is_bold_font_name("BOLDXX+CMR10"));
        assert!(!is_bold_font_name("NimbusRomNo9L-Regu"));
    }

    #[test]
    fn malformed_xml_is_a_page_access_error() {
        assert!(matches!(
            bold_lines_from_xml("<page><line></block></page>"),
            Err(BackendError::PageAccess(_))
        ));
    }

    #[test]
    fn fractional_sizes_and_tops_survive_conversion() {
        let layout = assemble_layout(
            612.0,
            792.0,
            vec![vec![
                glyphs("Sparse Attention Revisited", 17.2154, 99.21),
                glyphs("A Technical Note", 17.0, 121.6),
            ]],
            &[true, false],
        );
        let lines = extract_lines(&layout).unwrap();
        assert!((lines[0].font_size - 17.2154).abs() < 1e-4);
        assert!((lines[0].y_position - 99.21 / 792.0).abs() < 1e-6);
        assert!(lines[0].is_bold);
        assert!(!lines[1].is_bold);

        // a whole-point size would tie the subtitle with the title
        assert_eq!(
            select_title_candidate(&lines, &HeuristicConfig::default()),
            "Sparse Attention Revisited"
        );
    }

    #[test]
    fn misaligned_flags_leave_lines_not_bold() {
        let layout = assemble_layout(
            612.0,
            792.0,
            vec![vec![glyphs("One", 12.0, 100.0)], vec![glyphs("Two", 12.0, 200.0)]],
            &[true],
        );
        let lines = extract_lines(&layout).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| !l.is_bold));
    }

    #[test]
    fn line_without_glyphs_has_no_size() {
        let layout = assemble_layout(
            612.0,
            792.0,
            vec![vec![LineGlyphs {
                text: "x".into(),
                max_size: None,
                top: 50.0,
                bounds: [0.0, 50.0, 10.0, 60.0],
            }]],
            &[false],
        );
        let span = &layout.blocks[0].lines.as_ref().unwrap()[0].spans[0];
        assert_eq!(span.size, None);
        assert_eq!(span.flags, Some(0));
    }

    #[test]
    fn missing_file_is_a_document_open_error() {
        let result = MupdfBackend::new().first_page_layout(Path::new("/nonexistent/paper.pdf"));
        assert!(matches!(result, Err(BackendError::DocumentOpen(_))));
    }
}
