//! Persisted model artifact.
//!
//! The file is a JSON document carrying a format version, the feature
//! column names the model was trained on, and the model itself tagged by
//! kind. It is tied to this crate's version, not a portable interchange
//! format.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::forest::RandomForest;
use crate::{ClassifierError, FEATURE_NAMES, FeatureVector, TitleScorer};

pub const FORMAT_VERSION: u32 = 1;

/// Every learner a model file can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SavedModel {
    RandomForest(RandomForest),
}

impl TitleScorer for SavedModel {
    fn title_probability(&self, features: &FeatureVector) -> f64 {
        match self {
            SavedModel::RandomForest(forest) => forest.predict_proba(features),
        }
    }
}

impl SavedModel {
    pub fn kind(&self) -> &'static str {
        match self {
            SavedModel::RandomForest(_) => "random_forest",
        }
    }

    pub fn feature_importances(&self) -> &[f64] {
        match self {
            SavedModel::RandomForest(forest) => &forest.feature_importances,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub feature_names: Vec<String>,
    pub model: SavedModel,
}

impl ModelArtifact {
    pub fn new(model: SavedModel) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            model,
        }
    }

    /// Reject artifacts this build cannot score with.
    pub fn check_compatible(&self) -> Result<(), ClassifierError> {
        if self.format_version != FORMAT_VERSION {
            return Err(ClassifierError::IncompatibleModel(format!(
                "format version {} (expected {FORMAT_VERSION})",
                self.format_version
            )));
        }
        if self.feature_names != FEATURE_NAMES {
            return Err(ClassifierError::IncompatibleModel(format!(
                "trained on features {:?}, expected {:?}",
                self.feature_names, FEATURE_NAMES
            )));
        }
        match &self.model {
            SavedModel::RandomForest(forest) => forest
                .validate()
                .map_err(ClassifierError::IncompatibleModel),
        }
    }
}

impl TitleScorer for ModelArtifact {
    fn title_probability(&self, features: &FeatureVector) -> f64 {
        self.model.title_probability(features)
    }
}

/// Write `artifact` to `path`, creating parent directories.
pub fn save_model(path: &Path, artifact: &ModelArtifact) -> Result<(), ClassifierError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, artifact)?;
    writer.flush()?;
    tracing::info!(path = %path.display(), kind = artifact.model.kind(), "model saved");
    Ok(())
}

pub fn load_model(path: &Path) -> Result<ModelArtifact, ClassifierError> {
    let reader = BufReader::new(File::open(path)?);
    let artifact: ModelArtifact = serde_json::from_reader(reader)?;
    artifact.check_compatible()?;
    tracing::debug!(path = %path.display(), kind = artifact.model.kind(), "model loaded");
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::ForestParams;

    fn tiny_forest() -> RandomForest {
        let x: Vec<FeatureVector> = (0..12)
            .map(|i| [i as f64, 0.05 * i as f64, if i < 2 { 16.0 } else { 10.0 }, 0.0])
            .collect();
        let y: Vec<bool> = (0..12).map(|i| i < 2).collect();
        let params = ForestParams {
            n_trees: 5,
            ..Default::default()
        };
        RandomForest::fit(&x, &y, &params, &mut fastrand::Rng::with_seed(42)).unwrap()
    }

    #[test]
    fn save_then_load_scores_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("title_classifier_rf.json");
        let artifact = ModelArtifact::new(SavedModel::RandomForest(tiny_forest()));
        save_model(&path, &artifact).unwrap();

        let loaded = load_model(&path).unwrap();
        let probe = [1.0, 0.05, 16.0, 0.0];
        assert_eq!(loaded.title_probability(&probe), artifact.title_probability(&probe));
        assert_eq!(loaded.model.kind(), "random_forest");
    }

    #[test]
    fn artifact_json_is_tagged_by_kind() {
        let artifact = ModelArtifact::new(SavedModel::RandomForest(tiny_forest()));
        let value = serde_json::to_value(&artifact).unwrap();
        assert_eq!(value["format_version"], 1);
        assert_eq!(value["model"]["kind"], "random_forest");
        assert_eq!(value["feature_names"][3], "is_bold");
    }

    #[test]
    fn wrong_version_or_features_are_rejected() {
        let mut artifact = ModelArtifact::new(SavedModel::RandomForest(tiny_forest()));
        artifact.format_version = 99;
        assert!(matches!(
            artifact.check_compatible(),
            Err(ClassifierError::IncompatibleModel(_))
        ));

        let mut artifact = ModelArtifact::new(SavedModel::RandomForest(tiny_forest()));
        artifact.feature_names.swap(0, 1);
        assert!(matches!(
            artifact.check_compatible(),
            Err(ClassifierError::IncompatibleModel(_))
        ));
    }

    #[test]
    fn garbage_file_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, b"\x00\x01 not a model").unwrap();
        assert!(matches!(load_model(&path), Err(ClassifierError::Json(_))));
    }
}
