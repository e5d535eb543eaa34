use std::path::Path;

use pdftitle_core::{PdfBackend, PdfTextLine, extract_first_page_lines};

use crate::{ClassifierError, FeatureVector, TitleScorer, line_features};

/// Lines scoring strictly above this are title lines.
pub const TITLE_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct TitlePrediction {
    pub title: String,
    /// `line_index` of every line joined into `title`, in page order.
    pub line_indices: Vec<usize>,
    /// One probability per input line.
    pub probabilities: Vec<f64>,
    /// No line cleared the threshold; the single best line was used.
    pub used_fallback: bool,
}

/// Turns per-line scores into a title string.
pub struct TitlePredictor<S> {
    scorer: S,
}

impl<S: TitleScorer> TitlePredictor<S> {
    pub fn new(scorer: S) -> Self {
        Self { scorer }
    }

    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    /// Join every line scoring above [`TITLE_THRESHOLD`], falling back to
    /// the first highest-scoring line when none does. An empty line
    /// sequence is an error; any other input yields a title.
    pub fn predict_lines(&self, lines: &[PdfTextLine]) -> Result<TitlePrediction, ClassifierError> {
        if lines.is_empty() {
            return Err(ClassifierError::NoText);
        }
        let features: Vec<FeatureVector> = lines.iter().map(line_features).collect();
        let probabilities = self.scorer.title_probabilities(&features);

        let mut selected: Vec<usize> = probabilities
            .iter()
            .enumerate()
            .filter(|&(_, &p)| p > TITLE_THRESHOLD)
            .map(|(i, _)| i)
            .collect();
        let used_fallback = selected.is_empty();
        if used_fallback {
            let best = probabilities
                .iter()
                .enumerate()
                .fold(0, |best, (i, &p)| if p > probabilities[best] { i } else { best });
            selected.push(best);
        }

        let title = selected
            .iter()
            .map(|&i| lines[i].text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string();

        Ok(TitlePrediction {
            title,
            line_indices: selected.iter().map(|&i| lines[i].line_index).collect(),
            probabilities,
            used_fallback,
        })
    }

    /// Extract the first page of `path` and predict its title.
    pub fn predict_pdf(
        &self,
        path: &Path,
        backend: &dyn PdfBackend,
    ) -> Result<TitlePrediction, ClassifierError> {
        let lines = extract_first_page_lines(path, backend)?;
        let prediction = self.predict_lines(&lines)?;
        tracing::debug!(
            path = %path.display(),
            lines = lines.len(),
            fallback = prediction.used_fallback,
            "predicted title"
        );
        Ok(prediction)
    }
}
