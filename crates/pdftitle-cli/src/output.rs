use std::io::Write;
use std::path::Path;

use owo_colors::OwoColorize;

use pdftitle_classifier::{TitlePrediction, TrainingOutcome};
use pdftitle_core::PdfTextLine;
use pdftitle_corpus::training_set::HeuristicEvaluation;
use pdftitle_corpus::{DownloadSummary, SampleOutcome, TrainingSetSummary, section_year_counts};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn heading(w: &mut dyn Write, text: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", text.bold())
    } else {
        writeln!(w, "{}", text)
    }
}

pub fn print_sample_summary(
    w: &mut dyn Write,
    outcome: &SampleOutcome,
    output: &Path,
    color: ColorMode,
) -> std::io::Result<()> {
    let stats = &outcome.stats;
    writeln!(w, "Read {} metadata records", stats.lines_read)?;
    let dropped = [
        ("malformed", stats.malformed),
        ("no journal-ref", stats.no_journal_ref),
        ("legacy id", stats.legacy_id),
        ("year out of range", stats.year_out_of_range),
        ("no target category", stats.no_matching_category),
    ];
    let dropped: Vec<String> = dropped
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|(label, n)| format!("{} {}", n, label))
        .collect();
    if !dropped.is_empty() {
        let line = format!("(Skipped {})", dropped.join(", "));
        if color.enabled() {
            writeln!(w, "{}", line.dimmed())?;
        } else {
            writeln!(w, "{}", line)?;
        }
    }
    writeln!(w)?;

    heading(w, "Per category (seen / kept):", color)?;
    for (category, seen, kept) in &stats.per_category {
        writeln!(w, "  {:<10} {:>10} / {}", category, seen, kept)?;
    }
    writeln!(w)?;

    heading(w, "Distribution by section and year:", color)?;
    for ((section, year), count) in section_year_counts(&outcome.records) {
        writeln!(w, "  {:<20} {}  {:>5}", section, year, count)?;
    }
    writeln!(w)?;

    let saved = format!(
        "Saved {} gold records to {}",
        outcome.records.len(),
        output.display()
    );
    if color.enabled() {
        writeln!(w, "{}", saved.green())?;
    } else {
        writeln!(w, "{}", saved)?;
    }
    Ok(())
}

pub fn print_download_summary(
    w: &mut dyn Write,
    summary: &DownloadSummary,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    writeln!(w, "Downloaded:      {}", summary.downloaded)?;
    writeln!(w, "Already present: {}", summary.already_present)?;
    writeln!(w, "HTTP errors:     {}", summary.http_errors)?;
    writeln!(w, "Failed:          {}", summary.failed)?;
    if summary.rate_limited {
        let msg = "Stopped early: the server answered 403 Forbidden. Wait before retrying.";
        if color.enabled() {
            writeln!(w, "{}", msg.red())?;
        } else {
            writeln!(w, "{}", msg)?;
        }
    } else if summary.limit_reached {
        writeln!(w, "Stopped at the requested limit.")?;
    }
    Ok(())
}

pub fn print_training_set_summary(
    w: &mut dyn Write,
    summary: &TrainingSetSummary,
    output: &Path,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w, "PDF files found:     {}", summary.files_seen)?;
    writeln!(w, "Processed:           {}", summary.processed)?;
    writeln!(w, "Skipped (no title):  {}", summary.skipped_no_title)?;
    writeln!(w, "Failed to extract:   {}", summary.failed)?;
    writeln!(
        w,
        "Rows written:        {} ({} TITLE)",
        summary.rows, summary.title_rows
    )?;
    let saved = format!("Training set saved to {}", output.display());
    if color.enabled() {
        writeln!(w, "{}", saved.green())?;
    } else {
        writeln!(w, "{}", saved)?;
    }
    Ok(())
}

pub fn print_training_report(
    w: &mut dyn Write,
    outcome: &TrainingOutcome,
    model_path: &Path,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(
        w,
        "Trained on {} rows, evaluated on {} held-out rows",
        outcome.train_size, outcome.test_size
    )?;
    writeln!(w)?;
    heading(w, "Classification report:", color)?;
    writeln!(w, "{}", outcome.report)?;
    writeln!(w)?;
    heading(w, "Feature importance:", color)?;
    for (name, importance) in outcome.ranked_importances() {
        writeln!(w, "  {:<12} {:.4}", name, importance)?;
    }
    writeln!(w)?;
    let saved = format!("Model saved to {}", model_path.display());
    if color.enabled() {
        writeln!(w, "{}", saved.green())?;
    } else {
        writeln!(w, "{}", saved)?;
    }
    Ok(())
}

pub fn print_prediction(
    w: &mut dyn Write,
    path: &Path,
    prediction: &TitlePrediction,
    color: ColorMode,
) -> std::io::Result<()> {
    let name = display_name(path);
    if color.enabled() {
        write!(w, "{}: {}", name.bold(), prediction.title.green())?;
        if prediction.used_fallback {
            write!(w, " {}", "(low confidence)".yellow())?;
        }
    } else {
        write!(w, "{}: {}", name, prediction.title)?;
        if prediction.used_fallback {
            write!(w, " (low confidence)")?;
        }
    }
    writeln!(w)
}

pub fn print_error_line(
    w: &mut dyn Write,
    path: &Path,
    error: &dyn std::fmt::Display,
    color: ColorMode,
) -> std::io::Result<()> {
    let name = display_name(path);
    if color.enabled() {
        writeln!(w, "{}: {} {}", name.bold(), "ERROR".red(), error)
    } else {
        writeln!(w, "{}: ERROR {}", name, error)
    }
}

pub fn print_heuristic_evaluation(
    w: &mut dyn Write,
    eval: &HeuristicEvaluation,
    color: ColorMode,
) -> std::io::Result<()> {
    for guess in &eval.guesses {
        let name = display_name(&guess.path);
        if color.enabled() {
            let mark = if guess.is_match() {
                "MATCH".green().to_string()
            } else {
                "MISS".red().to_string()
            };
            writeln!(w, "{} [{}]", name.bold(), mark)?;
        } else {
            let mark = if guess.is_match() { "MATCH" } else { "MISS" };
            writeln!(w, "{} [{}]", name, mark)?;
        }
        writeln!(w, "  PRED: {}", guess.predicted)?;
        writeln!(w, "  TRUE: {}", guess.truth)?;
    }
    writeln!(w)?;
    let hits = eval.guesses.iter().filter(|g| g.is_match()).count();
    writeln!(
        w,
        "Exact match (ignoring case and spacing): {}/{} ({:.1}%)",
        hits,
        eval.guesses.len(),
        eval.accuracy() * 100.0
    )?;
    if eval.failed > 0 || eval.skipped_no_title > 0 {
        let line = format!(
            "(Skipped {} without a gold title, {} unreadable)",
            eval.skipped_no_title, eval.failed
        );
        if color.enabled() {
            writeln!(w, "{}", line.dimmed())?;
        } else {
            writeln!(w, "{}", line)?;
        }
    }
    Ok(())
}

pub fn print_lines(
    w: &mut dyn Write,
    lines: &[PdfTextLine],
    color: ColorMode,
) -> std::io::Result<()> {
    let header = format!("{:>4} {:>7} {:>6} {:>4}  text", "idx", "y", "size", "bold");
    heading(w, &header, color)?;
    for line in lines {
        writeln!(
            w,
            "{:>4} {:>7.3} {:>6.1} {:>4}  {}",
            line.line_index,
            line.y_position,
            line.font_size,
            if line.is_bold { "B" } else { "" },
            line.text
        )?;
    }
    Ok(())
}
