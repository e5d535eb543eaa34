use std::path::{Path, PathBuf};
use std::time::Duration;

use pdftitle_classifier::{ForestParams, TrainingConfig};
use pdftitle_core::HeuristicConfig;
use pdftitle_core::config_file::{ConfigFile, load_config, load_from_path, merge};
use pdftitle_corpus::{DownloadConfig, SamplerConfig};

pub const DEFAULT_METADATA_PATH: &str = "data/raw/arxiv-metadata-oai-snapshot.json";
pub const DEFAULT_GOLD_PATH: &str = "data/processed/gold_standard.jsonl";
pub const DEFAULT_PDF_DIR: &str = "data/raw/raw_pdfs";
pub const DEFAULT_TRAINING_SET_PATH: &str = "data/processed/training_set_v1.jsonl";
pub const DEFAULT_MODEL_PATH: &str = "models/title_classifier_rf.json";
pub const DEFAULT_SEED: u64 = 42;

/// Load the cascaded config, then layer `--config` on top when given.
pub fn load_layered(extra: Option<&Path>) -> anyhow::Result<ConfigFile> {
    let base = load_config();
    match extra {
        None => Ok(base),
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            let overlay = load_from_path(path)
                .ok_or_else(|| anyhow::anyhow!("Could not parse config file {}", path.display()))?;
            Ok(merge(base, overlay))
        }
    }
}

#[derive(Debug, Clone)]
pub struct Paths {
    pub metadata: PathBuf,
    pub gold: PathBuf,
    pub pdf_dir: PathBuf,
    pub training_set: PathBuf,
    pub model: PathBuf,
}

/// Effective settings after applying flags > env vars > config file > defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub paths: Paths,
    pub sampler: SamplerConfig,
    pub sampling_seed: u64,
    pub heuristic: HeuristicConfig,
    pub download: DownloadConfig,
    pub training: TrainingConfig,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_seed() -> Option<u64> {
    let raw = env_var("PDFTITLE_SEED")?;
    match raw.trim().parse() {
        Ok(seed) => Some(seed),
        Err(_) => {
            tracing::warn!(value = %raw, "ignoring non-numeric PDFTITLE_SEED");
            None
        }
    }
}

impl Settings {
    pub fn resolve(file: &ConfigFile, seed_flag: Option<u64>) -> Self {
        let p = file.paths.clone().unwrap_or_default();
        let path_or = |v: Option<String>, default: &str| {
            PathBuf::from(v.unwrap_or_else(|| default.to_string()))
        };
        let paths = Paths {
            metadata: path_or(p.metadata_path, DEFAULT_METADATA_PATH),
            gold: path_or(p.gold_path, DEFAULT_GOLD_PATH),
            pdf_dir: path_or(p.pdf_dir, DEFAULT_PDF_DIR),
            training_set: path_or(p.training_set_path, DEFAULT_TRAINING_SET_PATH),
            model: path_or(p.model_path, DEFAULT_MODEL_PATH),
        };

        let cli_or_env_seed = seed_flag.or_else(env_seed);

        let s = file.sampling.clone().unwrap_or_default();
        let sampler_defaults = SamplerConfig::default();
        let sampler = SamplerConfig {
            categories: s.categories.unwrap_or(sampler_defaults.categories),
            samples_per_category: s
                .samples_per_category
                .unwrap_or(sampler_defaults.samples_per_category),
        };
        let sampling_seed = cli_or_env_seed.or(s.seed).unwrap_or(DEFAULT_SEED);

        let d = file.download.clone().unwrap_or_default();
        let dl_defaults = DownloadConfig::default();
        let download = DownloadConfig {
            base_url: d.base_url.unwrap_or(dl_defaults.base_url),
            user_agent: env_var("PDFTITLE_USER_AGENT")
                .or(d.user_agent)
                .unwrap_or(dl_defaults.user_agent),
            timeout: d.timeout_secs.map(Duration::from_secs).unwrap_or(dl_defaults.timeout),
            delay: d.delay_secs.map(Duration::from_secs).unwrap_or(dl_defaults.delay),
            error_delay: d
                .error_delay_secs
                .map(Duration::from_secs)
                .unwrap_or(dl_defaults.error_delay),
            limit: None,
        };

        let t = file.training.clone().unwrap_or_default();
        let forest_defaults = ForestParams::default();
        let training = TrainingConfig {
            seed: cli_or_env_seed.or(t.seed).unwrap_or(DEFAULT_SEED),
            test_fraction: t
                .test_fraction
                .unwrap_or(pdftitle_classifier::trainer::DEFAULT_TEST_FRACTION),
            forest: ForestParams {
                n_trees: t.n_trees.unwrap_or(forest_defaults.n_trees),
                max_depth: t.max_depth.or(forest_defaults.max_depth),
                min_samples_split: t
                    .min_samples_split
                    .unwrap_or(forest_defaults.min_samples_split),
                min_samples_leaf: t
                    .min_samples_leaf
                    .unwrap_or(forest_defaults.min_samples_leaf),
                ..forest_defaults
            },
        };

        Self {
            paths,
            sampler,
            sampling_seed,
            heuristic: file.heuristic_config(),
            download,
            training,
        }
    }
}
