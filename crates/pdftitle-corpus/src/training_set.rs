//! Weakly-labeled training-set construction and dataset inspection.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use pdftitle_core::records::write_jsonl;
use pdftitle_core::{
    HeuristicConfig, LineLabel, PdfBackend, TrainingRow, extract_first_page_lines,
    select_title_candidate, squash,
};

use crate::CorpusError;

/// All `*.pdf` files directly inside `dir`, sorted by path.
pub fn list_pdf_files(dir: &Path) -> Result<Vec<PathBuf>, CorpusError> {
    let entries = std::fs::read_dir(dir)?.map(|entry| entry.map(|e| e.path()));
    Ok(collect_pdf_paths(dir, entries))
}

/// Keep regular `*.pdf` files, logging and skipping entries that could not
/// be read.
fn collect_pdf_paths(
    dir: &Path,
    entries: impl IntoIterator<Item = std::io::Result<PathBuf>>,
) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = entries
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(
                    dir = %dir.display(),
                    error = %e,
                    "skipping unreadable directory entry"
                );
                None
            }
        })
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    files.sort();
    files
}

/// Gold title for a PDF, keyed by its file stem. Files downloaded for
/// old-style ids have `/` replaced by `_`, so that form is tried too.
pub fn title_for_file<'a>(path: &Path, titles: &'a HashMap<String, String>) -> Option<&'a str> {
    let stem = path.file_stem()?.to_str()?;
    titles
        .get(stem)
        .or_else(|| titles.get(&stem.replacen('_', "/", 1)))
        .map(String::as_str)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrainingSetSummary {
    pub files_seen: usize,
    pub processed: usize,
    pub skipped_no_title: usize,
    pub failed: usize,
    pub rows: usize,
    pub title_rows: usize,
}

/// Extract and weakly label every PDF in `pdf_dir` that has a gold title,
/// writing one JSON row per line to `writer`.
///
/// Extraction failures are logged and counted; the remaining files are
/// still processed.
pub fn build_training_set<W: Write>(
    pdf_dir: &Path,
    titles: &HashMap<String, String>,
    backend: &dyn PdfBackend,
    mut writer: W,
    mut on_file: impl FnMut(&Path),
) -> Result<TrainingSetSummary, CorpusError> {
    let files = list_pdf_files(pdf_dir)?;
    let mut summary = TrainingSetSummary {
        files_seen: files.len(),
        ..Default::default()
    };

    for path in &files {
        on_file(path);
        let Some(title) = title_for_file(path, titles) else {
            summary.skipped_no_title += 1;
            tracing::debug!(path = %path.display(), "no gold title, skipping");
            continue;
        };

        let lines = match extract_first_page_lines(path, backend) {
            Ok(lines) => lines,
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(path = %path.display(), error = %e, "extraction failed");
                continue;
            }
        };

        let rows: Vec<TrainingRow> = lines
            .into_iter()
            .filter_map(|l| TrainingRow::from_line(&l.labeled_against(title)))
            .collect();
        let title_rows = rows.iter().filter(|r| r.is_title()).count();
        if title_rows == 0 {
            tracing::debug!(path = %path.display(), "no line matched the gold title");
        }

        summary.rows += write_jsonl(&mut writer, &rows)?;
        summary.title_rows += title_rows;
        summary.processed += 1;
    }

    tracing::info!(
        files = summary.files_seen,
        processed = summary.processed,
        failed = summary.failed,
        rows = summary.rows,
        "training set built"
    );
    Ok(summary)
}

/// [`build_training_set`] writing to a file, which is created or truncated.
pub fn build_training_set_file(
    pdf_dir: &Path,
    titles: &HashMap<String, String>,
    backend: &dyn PdfBackend,
    output: &Path,
    on_file: impl FnMut(&Path),
) -> Result<TrainingSetSummary, CorpusError> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(output)?);
    build_training_set(pdf_dir, titles, backend, writer, on_file)
}

/// Row count and mean font size for one label.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LabelStats {
    pub count: usize,
    pub mean_font_size: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetStats {
    pub total: usize,
    pub title: LabelStats,
    pub other: LabelStats,
}

impl DatasetStats {
    pub fn from_rows(rows: &[TrainingRow]) -> Self {
        let summarize = |label: LineLabel| {
            let sizes: Vec<f64> = rows
                .iter()
                .filter(|r| r.label == label)
                .map(|r| r.font_size)
                .collect();
            let mean = if sizes.is_empty() {
                0.0
            } else {
                sizes.iter().sum::<f64>() / sizes.len() as f64
            };
            LabelStats {
                count: sizes.len(),
                mean_font_size: mean,
            }
        };
        Self {
            total: rows.len(),
            title: summarize(LineLabel::Title),
            other: summarize(LineLabel::Other),
        }
    }

    pub fn title_fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.title.count as f64 / self.total as f64
        }
    }
}

impl fmt::Display for DatasetStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total rows: {}", self.total)?;
        writeln!(f, "Label distribution:")?;
        writeln!(f, "  TITLE  {:>8}", self.title.count)?;
        writeln!(f, "  OTHER  {:>8}", self.other.count)?;
        writeln!(f, "Mean font size by label:")?;
        writeln!(f, "  TITLE  {:>8.2}", self.title.mean_font_size)?;
        write!(f, "  OTHER  {:>8.2}", self.other.mean_font_size)
    }
}

/// One heuristic guess next to the gold title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeuristicGuess {
    pub path: PathBuf,
    pub predicted: String,
    pub truth: String,
}

impl HeuristicGuess {
    /// Exact match once whitespace is removed and case folded.
    pub fn is_match(&self) -> bool {
        squash(&self.predicted) == squash(&self.truth)
    }
}

#[derive(Debug, Clone, Default)]
pub struct HeuristicEvaluation {
    pub guesses: Vec<HeuristicGuess>,
    pub failed: usize,
    pub skipped_no_title: usize,
}

impl HeuristicEvaluation {
    pub fn accuracy(&self) -> f64 {
        if self.guesses.is_empty() {
            return 0.0;
        }
        let hits = self.guesses.iter().filter(|g| g.is_match()).count();
        hits as f64 / self.guesses.len() as f64
    }
}

/// Run the heuristic selector over `files` and compare with gold titles.
pub fn evaluate_heuristic(
    files: &[PathBuf],
    titles: &HashMap<String, String>,
    backend: &dyn PdfBackend,
    config: &HeuristicConfig,
) -> HeuristicEvaluation {
    let mut eval = HeuristicEvaluation::default();
    for path in files {
        let Some(truth) = title_for_file(path, titles) else {
            eval.skipped_no_title += 1;
            continue;
        };
        match extract_first_page_lines(path, backend) {
            Ok(lines) => eval.guesses.push(HeuristicGuess {
                path: path.clone(),
                predicted: select_title_candidate(&lines, config),
                truth: truth.to_string(),
            }),
            Err(e) => {
                eval.failed += 1;
                tracing::warn!(path = %path.display(), error = %e, "extraction failed");
            }
        }
    }
    eval
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(label: LineLabel, size: f64) -> TrainingRow {
        TrainingRow {
            text: "x".into(),
            page_number: 0,
            line_index: 0,
            y_position: 0.1,
            font_size: size,
            is_bold: false,
            label,
        }
    }

    #[test]
    fn stats_by_label() {
        let rows = vec![
            row(LineLabel::Title, 17.0),
            row(LineLabel::Title, 15.0),
            row(LineLabel::Other, 10.0),
            row(LineLabel::Other, 10.0),
            row(LineLabel::Other, 13.0),
        ];
        let stats = DatasetStats::from_rows(&rows);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.title.count, 2);
        assert_eq!(stats.title.mean_font_size, 16.0);
        assert_eq!(stats.other.mean_font_size, 11.0);
        assert!((stats.title_fraction() - 0.4).abs() < 1e-12);
        assert!(stats.to_string().contains("TITLE"));
    }

    #[test]
    fn stats_of_empty_dataset() {
        let stats = DatasetStats::from_rows(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.title_fraction(), 0.0);
        assert_eq!(stats.other.mean_font_size, 0.0);
    }

    #[test]
    fn title_lookup_by_stem() {
        let titles: HashMap<String, String> = [
            ("0704.0001".to_string(), "A".to_string()),
            ("hep-ph/0307015".to_string(), "B".to_string()),
        ]
        .into();
        assert_eq!(title_for_file(Path::new("/d/0704.0001.pdf"), &titles), Some("A"));
        assert_eq!(title_for_file(Path::new("hep-ph_0307015.pdf"), &titles), Some("B"));
        assert_eq!(title_for_file(Path::new("9999.0001.pdf"), &titles), None);
    }

    #[test]
    fn guess_match_ignores_spacing_and_case() {
        let guess = HeuristicGuess {
            path: PathBuf::from("a.pdf"),
            predicted: "Deep  Residual Learning".into(),
            truth: "deep residual learning".into(),
        };
        assert!(guess.is_match());
    }

    #[test]
    fn lists_only_pdfs_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.PDF", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("c.pdf")).unwrap();
        let names: Vec<String> = list_pdf_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
    }

    #[test]
    fn unreadable_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("0704.0001.pdf");
        std::fs::write(&good, b"x").unwrap();
        let entries = vec![
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied")),
            Ok(good.clone()),
        ];
        assert_eq!(collect_pdf_paths(dir.path(), entries), vec![good]);
    }
}
