use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub paths: Option<PathsConfig>,
    pub sampling: Option<SamplingConfig>,
    pub heuristic: Option<HeuristicSection>,
    pub download: Option<DownloadSection>,
    pub training: Option<TrainingSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    pub metadata_path: Option<String>,
    pub gold_path: Option<String>,
    pub pdf_dir: Option<String>,
    pub training_set_path: Option<String>,
    pub model_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    pub categories: Option<Vec<String>>,
    pub samples_per_category: Option<usize>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeuristicSection {
    pub watermark_markers: Option<Vec<String>>,
    pub band_top: Option<f64>,
    pub band_bottom: Option<f64>,
    pub size_tolerance: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadSection {
    pub base_url: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_secs: Option<u64>,
    pub delay_secs: Option<u64>,
    pub error_delay_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingSection {
    pub seed: Option<u64>,
    pub test_fraction: Option<f64>,
    pub n_trees: Option<usize>,
    pub max_depth: Option<usize>,
    pub min_samples_split: Option<usize>,
    pub min_samples_leaf: Option<usize>,
}

/// Platform config directory path: `<config_dir>/pdftitle/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pdftitle").join("config.toml"))
}

/// Load config by cascading CWD `.pdftitle.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".pdftitle.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

/// Pick `overlay`'s field when set, else `base`'s.
fn pick<S, T: Clone>(
    base: &Option<S>,
    overlay: &Option<S>,
    field: impl Fn(&S) -> &Option<T>,
) -> Option<T> {
    overlay
        .as_ref()
        .and_then(|s| field(s).clone())
        .or_else(|| base.as_ref().and_then(|s| field(s).clone()))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        paths: Some(PathsConfig {
            metadata_path: pick(&base.paths, &overlay.paths, |p| &p.metadata_path),
            gold_path: pick(&base.paths, &overlay.paths, |p| &p.gold_path),
            pdf_dir: pick(&base.paths, &overlay.paths, |p| &p.pdf_dir),
            training_set_path: pick(&base.paths, &overlay.paths, |p| &p.training_set_path),
            model_path: pick(&base.paths, &overlay.paths, |p| &p.model_path),
        }),
        sampling: Some(SamplingConfig {
            categories: pick(&base.sampling, &overlay.sampling, |s| &s.categories),
            samples_per_category: pick(&base.sampling, &overlay.sampling, |s| {
                &s.samples_per_category
            }),
            seed: pick(&base.sampling, &overlay.sampling, |s| &s.seed),
        }),
        heuristic: Some(HeuristicSection {
            watermark_markers: pick(&base.heuristic, &overlay.heuristic, |h| {
                &h.watermark_markers
            }),
            band_top: pick(&base.heuristic, &overlay.heuristic, |h| &h.band_top),
            band_bottom: pick(&base.heuristic, &overlay.heuristic, |h| &h.band_bottom),
            size_tolerance: pick(&base.heuristic, &overlay.heuristic, |h| &h.size_tolerance),
        }),
        download: Some(DownloadSection {
            base_url: pick(&base.download, &overlay.download, |d| &d.base_url),
            user_agent: pick(&base.download, &overlay.download, |d| &d.user_agent),
            timeout_secs: pick(&base.download, &overlay.download, |d| &d.timeout_secs),
            delay_secs: pick(&base.download, &overlay.download, |d| &d.delay_secs),
            error_delay_secs: pick(&base.download, &overlay.download, |d| &d.error_delay_secs),
        }),
        training: Some(TrainingSection {
            seed: pick(&base.training, &overlay.training, |t| &t.seed),
            test_fraction: pick(&base.training, &overlay.training, |t| &t.test_fraction),
            n_trees: pick(&base.training, &overlay.training, |t| &t.n_trees),
            max_depth: pick(&base.training, &overlay.training, |t| &t.max_depth),
            min_samples_split: pick(&base.training, &overlay.training, |t| {
                &t.min_samples_split
            }),
            min_samples_leaf: pick(&base.training, &overlay.training, |t| &t.min_samples_leaf),
        }),
    }
}

impl ConfigFile {
    /// Heuristic settings with unset fields taken from the defaults.
    pub fn heuristic_config(&self) -> crate::HeuristicConfig {
        let defaults = crate::HeuristicConfig::default();
        let Some(h) = &self.heuristic else {
            return defaults;
        };
        crate::HeuristicConfig {
            watermark_markers: h
                .watermark_markers
                .clone()
                .unwrap_or(defaults.watermark_markers),
            band_top: h.band_top.unwrap_or(defaults.band_top),
            band_bottom: h.band_bottom.unwrap_or(defaults.band_bottom),
            size_tolerance: h.size_tolerance.unwrap_or(defaults.size_tolerance),
        }
    }
}

/// Save the current config to the platform config directory.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf, String> {
    let path = config_path().ok_or_else(|| "Could not determine config directory".to_string())?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let content =
        toml::to_string_pretty(config).map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(&path, content).map_err(|e| format!("Failed to write config: {}", e))?;
    Ok(path)
}
