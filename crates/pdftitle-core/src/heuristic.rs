//! Zero-training title guess from font-size dominance inside the title band.

use serde::{Deserialize, Serialize};

use crate::PdfTextLine;

/// Tuning for [`select_title_candidate`].
///
/// The defaults fit single-column arXiv first pages: the band excludes the
/// running header above and the author/affiliation block below, and the
/// watermark marker drops arXiv's rotated side stamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicConfig {
    /// Lines containing any of these substrings are ignored.
    pub watermark_markers: Vec<String>,
    /// Exclusive lower bound of the normalized y band.
    pub band_top: f64,
    /// Exclusive upper bound of the normalized y band.
    pub band_bottom: f64,
    /// Absolute font-size difference under which a line ties the maximum.
    pub size_tolerance: f64,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            watermark_markers: vec!["arXiv".to_string()],
            band_top: 0.08,
            band_bottom: 0.35,
            size_tolerance: 0.1,
        }
    }
}

impl HeuristicConfig {
    fn in_band(&self, line: &PdfTextLine) -> bool {
        self.band_top < line.y_position && line.y_position < self.band_bottom
    }

    fn is_watermark(&self, line: &PdfTextLine) -> bool {
        self.watermark_markers
            .iter()
            .any(|m| !m.is_empty() && line.text.contains(m.as_str()))
    }
}

/// Guess the title from geometry alone.
///
/// Keeps band lines that are not watermarks, then joins (in page order)
/// every one whose font size is within `size_tolerance` of the largest.
/// Returns `""` when the band is empty. A subtitle or author line set in
/// the same size as the title is included too.
pub fn select_title_candidate(lines: &[PdfTextLine], config: &HeuristicConfig) -> String {
    let zone: Vec<&PdfTextLine> = lines
        .iter()
        .filter(|l| !config.is_watermark(l) && config.in_band(l))
        .collect();

    let Some(max_size) = zone.iter().map(|l| l.font_size).reduce(f64::max) else {
        return String::new();
    };

    zone.iter()
        .filter(|l| (l.font_size - max_size).abs() < config.size_tolerance)
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
