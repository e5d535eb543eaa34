//! Line-level title classifier: training, evaluation and inference.
//!
//! Every line is reduced to four numbers (position in the page's line
//! sequence, normalized vertical position, font size, bold flag). A random
//! forest scores each tuple with a title probability, and inference joins
//! the lines that score above one half.

pub mod forest;
pub mod metrics;
pub mod model;
pub mod predictor;
pub mod split;
pub mod trainer;

use thiserror::Error;

use pdftitle_core::{BackendError, PdfTextLine, RecordError, TrainingRow};

pub use forest::{DecisionTree, ForestParams, RandomForest};
pub use metrics::{ClassMetrics, ClassificationReport, ConfusionMatrix};
pub use model::{FORMAT_VERSION, ModelArtifact, SavedModel, load_model, save_model};
pub use predictor::{TitlePrediction, TitlePredictor};
pub use split::stratified_split;
pub use trainer::{TrainingConfig, TrainingOutcome, load_training_rows, train};

pub const N_FEATURES: usize = 4;

/// Column names, in feature-vector order.
pub const FEATURE_NAMES: [&str; N_FEATURES] = ["line_index", "y_position", "font_size", "is_bold"];

pub type FeatureVector = [f64; N_FEATURES];

pub fn line_features(line: &PdfTextLine) -> FeatureVector {
    [
        line.line_index as f64,
        line.y_position,
        line.font_size,
        if line.is_bold { 1.0 } else { 0.0 },
    ]
}

pub fn row_features(row: &TrainingRow) -> FeatureVector {
    [
        row.line_index as f64,
        row.y_position,
        row.font_size,
        if row.is_bold { 1.0 } else { 0.0 },
    ]
}

/// Anything that maps feature vectors to title probabilities in `[0, 1]`.
///
/// Inference only depends on this, so the learning algorithm behind a saved
/// model can change without touching the predictor.
pub trait TitleScorer {
    fn title_probability(&self, features: &FeatureVector) -> f64;

    fn title_probabilities(&self, rows: &[FeatureVector]) -> Vec<f64> {
        rows.iter().map(|f| self.title_probability(f)).collect()
    }
}

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("No text found")]
    NoText,
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("model file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("incompatible model: {0}")]
    IncompatibleModel(String),
    #[error("cannot train: {0}")]
    InsufficientData(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdftitle_core::LineLabel;

    #[test]
    fn features_follow_column_order() {
        let row = TrainingRow {
            text: "Deep Residual Learning".into(),
            page_number: 0,
            line_index: 3,
            y_position: 0.14,
            font_size: 17.2,
            is_bold: true,
            label: LineLabel::Title,
        };
        assert_eq!(row_features(&row), [3.0, 0.14, 17.2, 1.0]);
        assert_eq!(FEATURE_NAMES[2], "font_size");
    }

    #[test]
    fn line_and_row_features_agree() {
        let line = PdfTextLine {
            text: "Abstract".into(),
            page_number: 0,
            line_index: 7,
            y_position: 0.41,
            font_size: 10.0,
            is_bold: false,
            label: None,
        };
        let row = TrainingRow::from_line(&line.clone().with_label(LineLabel::Other)).unwrap();
        assert_eq!(line_features(&line), row_features(&row));
    }
}
