//! Building the gold standard and the weakly-labeled training set.
//!
//! The pipeline runs in stages, each reading the previous stage's file:
//! sample metadata → enrich with citations → download PDFs → extract and
//! label first-page lines.

pub mod download;
pub mod gold;
pub mod sampler;
pub mod training_set;

use thiserror::Error;

use pdftitle_core::RecordError;

pub use download::{
    ArxivPdfSource, DownloadConfig, DownloadError, DownloadSummary, FetchOutcome, ItemStatus,
    PdfSource, download_papers, pdf_file_name,
};
pub use gold::{enrich_gold_standard, find_record, write_gold};
pub use sampler::{
    Reservoir, SampleOutcome, SampleStats, SamplerConfig, sample_corpus, sample_file,
    section_year_counts,
};
pub use training_set::{
    DatasetStats, HeuristicEvaluation, TrainingSetSummary, build_training_set,
    build_training_set_file, evaluate_heuristic, list_pdf_files,
};

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error("{path}: {count} unreadable line(s), refusing to rewrite")]
    Malformed { path: String, count: usize },
}
