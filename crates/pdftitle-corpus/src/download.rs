//! Polite batch retrieval of first-page PDFs for gold records.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://arxiv.org";
pub const DEFAULT_USER_AGENT: &str =
    "pdftitle/0.1 (academic title-extraction research; contact via repository)";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
/// Pause after every successful download.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(3);
/// Longer pause after a transport failure.
pub const DEFAULT_ERROR_DELAY: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP client error: {0}")]
    Client(String),
    #[error("request failed: {0}")]
    Network(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub delay: Duration,
    pub error_delay: Duration,
    /// Stop after this many new files have been written.
    pub limit: Option<usize>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            delay: DEFAULT_DELAY,
            error_delay: DEFAULT_ERROR_DELAY,
            limit: None,
        }
    }
}

/// What the server answered for one paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Pdf(Vec<u8>),
    /// HTTP 403; the host is refusing us and the batch should stop.
    Forbidden,
    /// Any other non-200 status.
    Status(u16),
}

/// A remote store of paper PDFs addressed by canonical id.
pub trait PdfSource: Send + Sync {
    fn name(&self) -> &str;

    fn fetch<'a>(
        &'a self,
        paper_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<FetchOutcome, DownloadError>> + Send + 'a>>;
}

/// [`PdfSource`] backed by `https://arxiv.org/pdf/<id>.pdf`.
pub struct ArxivPdfSource {
    client: reqwest::Client,
    base_url: String,
}

impl ArxivPdfSource {
    pub fn new(config: &DownloadConfig) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()
            .map_err(|e| DownloadError::Client(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn pdf_url(&self, paper_id: &str) -> String {
        format!("{}/pdf/{}.pdf", self.base_url, paper_id)
    }
}

impl PdfSource for ArxivPdfSource {
    fn name(&self) -> &str {
        "arXiv"
    }

    fn fetch<'a>(
        &'a self,
        paper_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<FetchOutcome, DownloadError>> + Send + 'a>> {
        Box::pin(async move {
            let resp = self
                .client
                .get(self.pdf_url(paper_id))
                .send()
                .await
                .map_err(|e| DownloadError::Network(e.to_string()))?;

            match resp.status().as_u16() {
                200 => {
                    let body = resp
                        .bytes()
                        .await
                        .map_err(|e| DownloadError::Network(e.to_string()))?;
                    Ok(FetchOutcome::Pdf(body.to_vec()))
                }
                403 => Ok(FetchOutcome::Forbidden),
                code => Ok(FetchOutcome::Status(code)),
            }
        })
    }
}

/// Local file name for a paper id. Old-style ids contain `/`.
pub fn pdf_file_name(paper_id: &str) -> String {
    format!("{}.pdf", paper_id.replace('/', "_"))
}

/// Per-paper result reported to the progress callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    Downloaded { bytes: usize },
    AlreadyPresent,
    BlankId,
    HttpStatus(u16),
    Failed(String),
    Forbidden,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub attempted: usize,
    pub downloaded: usize,
    pub already_present: usize,
    pub skipped_blank: usize,
    pub http_errors: usize,
    pub failed: usize,
    /// The source answered 403 and the batch was cut short.
    pub rate_limited: bool,
    /// The configured limit was reached.
    pub limit_reached: bool,
}

/// Fetch every paper in `ids` into `pdf_dir`, one at a time.
///
/// Existing files are never re-fetched. A 403 ends the batch; other
/// per-paper failures are logged and the loop moves on. Only failing to
/// create `pdf_dir` is an error.
pub async fn download_papers(
    ids: &[String],
    pdf_dir: &Path,
    source: &dyn PdfSource,
    config: &DownloadConfig,
    mut progress: impl FnMut(&str, &ItemStatus),
) -> Result<DownloadSummary, DownloadError> {
    std::fs::create_dir_all(pdf_dir)?;
    let mut summary = DownloadSummary::default();

    for id in ids {
        let id = id.trim();
        if id.is_empty() {
            summary.skipped_blank += 1;
            progress(id, &ItemStatus::BlankId);
            continue;
        }
        if config.limit.is_some_and(|limit| summary.downloaded >= limit) {
            summary.limit_reached = true;
            break;
        }

        let target = pdf_dir.join(pdf_file_name(id));
        if target.exists() {
            summary.already_present += 1;
            progress(id, &ItemStatus::AlreadyPresent);
            continue;
        }

        summary.attempted += 1;
        let status = match source.fetch(id).await {
            Ok(FetchOutcome::Pdf(bytes)) => match std::fs::write(&target, &bytes) {
                Ok(()) => {
                    summary.downloaded += 1;
                    tracing::debug!(paper_id = id, bytes = bytes.len(), "downloaded PDF");
                    tokio::time::sleep(config.delay).await;
                    ItemStatus::Downloaded { bytes: bytes.len() }
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(
                        paper_id = id,
                        path = %target.display(),
                        error = %e,
                        "could not write PDF"
                    );
                    ItemStatus::Failed(e.to_string())
                }
            },
            Ok(FetchOutcome::Forbidden) => {
                summary.rate_limited = true;
                tracing::warn!(
                    paper_id = id,
                    source = source.name(),
                    "403 Forbidden, stopping batch"
                );
                progress(id, &ItemStatus::Forbidden);
                break;
            }
            Ok(FetchOutcome::Status(code)) => {
                summary.http_errors += 1;
                tracing::warn!(paper_id = id, status = code, "unexpected HTTP status");
                ItemStatus::HttpStatus(code)
            }
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(paper_id = id, error = %e, "download failed");
                tokio::time::sleep(config.error_delay).await;
                ItemStatus::Failed(e.to_string())
            }
        };
        progress(id, &status);
    }

    tracing::info!(
        downloaded = summary.downloaded,
        present = summary.already_present,
        failed = summary.failed + summary.http_errors,
        rate_limited = summary.rate_limited,
        "download batch finished"
    );
    Ok(summary)
}
