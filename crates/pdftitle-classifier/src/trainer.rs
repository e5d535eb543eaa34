use std::path::Path;

use pdftitle_core::TrainingRow;
use pdftitle_core::records::read_jsonl;

use crate::forest::{ForestParams, RandomForest};
use crate::metrics::ClassificationReport;
use crate::model::{ModelArtifact, SavedModel};
use crate::split::stratified_split;
use crate::{ClassifierError, FEATURE_NAMES, FeatureVector, row_features};

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    /// Seeds both the train/test split and the forest.
    pub seed: u64,
    pub test_fraction: f64,
    pub forest: ForestParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            test_fraction: DEFAULT_TEST_FRACTION,
            forest: ForestParams::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: ModelArtifact,
    /// Evaluation on the held-out partition.
    pub report: ClassificationReport,
    pub train_size: usize,
    pub test_size: usize,
}

impl TrainingOutcome {
    /// `(feature name, importance)`, most important first.
    pub fn ranked_importances(&self) -> Vec<(&'static str, f64)> {
        let mut ranked: Vec<(&'static str, f64)> = FEATURE_NAMES
            .iter()
            .copied()
            .zip(self.artifact.model.feature_importances().iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

/// Read a training-set JSONL file, skipping malformed rows.
pub fn load_training_rows(path: &Path) -> Result<Vec<TrainingRow>, ClassifierError> {
    let parsed = read_jsonl::<TrainingRow>(path)?;
    if parsed.malformed > 0 {
        tracing::warn!(
            path = %path.display(),
            skipped = parsed.malformed,
            "skipped malformed training rows"
        );
    }
    Ok(parsed.records)
}

/// Fit a random forest on a stratified split of `rows` and evaluate it on
/// the held-out part.
pub fn train(
    rows: &[TrainingRow],
    config: &TrainingConfig,
) -> Result<TrainingOutcome, ClassifierError> {
    if rows.is_empty() {
        return Err(ClassifierError::InsufficientData("training set is empty".into()));
    }
    let labels: Vec<bool> = rows.iter().map(TrainingRow::is_title).collect();
    let n_titles = labels.iter().filter(|&&t| t).count();
    if n_titles == 0 || n_titles == labels.len() {
        return Err(ClassifierError::InsufficientData(
            "training set needs both TITLE and OTHER rows".into(),
        ));
    }
    let features: Vec<FeatureVector> = rows.iter().map(row_features).collect();

    let mut rng = fastrand::Rng::with_seed(config.seed);
    let (train_idx, test_idx) = stratified_split(&labels, config.test_fraction, &mut rng);
    if train_idx.is_empty() {
        return Err(ClassifierError::InsufficientData(
            "no rows left for training after the split".into(),
        ));
    }

    let pick = |idx: &[usize]| -> (Vec<FeatureVector>, Vec<bool>) {
        idx.iter().map(|&i| (features[i], labels[i])).unzip()
    };
    let (x_train, y_train) = pick(&train_idx);
    let (x_test, y_test) = pick(&test_idx);

    tracing::info!(
        rows = rows.len(),
        titles = n_titles,
        train = x_train.len(),
        test = x_test.len(),
        trees = config.forest.n_trees,
        "training random forest"
    );
    let forest = RandomForest::fit(&x_train, &y_train, &config.forest, &mut rng)?;

    let predicted: Vec<bool> = x_test.iter().map(|f| forest.predict(f)).collect();
    let report = ClassificationReport::new(&y_test, &predicted);
    tracing::info!(
        accuracy = report.accuracy,
        title_f1 = report.title.f1,
        "held-out evaluation"
    );

    Ok(TrainingOutcome {
        artifact: ModelArtifact::new(SavedModel::RandomForest(forest)),
        report,
        train_size: train_idx.len(),
        test_size: test_idx.len(),
    })
}
