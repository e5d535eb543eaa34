//! Download loop behavior against a scripted source, with tokio time paused
//! so the politeness delays cost nothing.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use pdftitle_corpus::{
    DownloadConfig, DownloadError, FetchOutcome, ItemStatus, PdfSource, download_papers,
};

#[derive(Clone)]
enum Scripted {
    Pdf(&'static [u8]),
    Forbidden,
    Status(u16),
    NetworkError,
}

struct ScriptedSource {
    responses: HashMap<&'static str, Scripted>,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl ScriptedSource {
    fn new(responses: &[(&'static str, Scripted)]) -> Self {
        Self {
            responses: responses.iter().cloned().collect(),
            calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PdfSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch<'a>(
        &'a self,
        paper_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<FetchOutcome, DownloadError>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().unwrap().push(paper_id.to_string());
            match self.responses.get(paper_id) {
                Some(Scripted::Pdf(bytes)) => Ok(FetchOutcome::Pdf(bytes.to_vec())),
                Some(Scripted::Forbidden) => Ok(FetchOutcome::Forbidden),
                Some(Scripted::Status(code)) => Ok(FetchOutcome::Status(*code)),
                Some(Scripted::NetworkError) | None => {
                    Err(DownloadError::Network("connection reset".into()))
                }
            }
        })
    }
}

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test(start_paused = true)]
async fn downloads_skip_existing_and_continue_past_errors() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("0704.0002.pdf"), b"old").unwrap();

    let source = ScriptedSource::new(&[
        ("0704.0001", Scripted::Pdf(b"%PDF-1.4 one")),
        ("0704.0003", Scripted::Status(404)),
        ("0704.0004", Scripted::NetworkError),
        ("hep-ph/0307015", Scripted::Pdf(b"%PDF-1.4 two")),
    ]);
    let mut statuses = Vec::new();

    let start = tokio::time::Instant::now();
    let summary = download_papers(
        &ids(&["0704.0001", "0704.0002", "  ", "0704.0003", "0704.0004", "hep-ph/0307015"]),
        dir.path(),
        &source,
        &DownloadConfig::default(),
        |id, status| statuses.push((id.to_string(), status.clone())),
    )
    .await
    .unwrap();

    assert_eq!(summary.downloaded, 2);
    assert_eq!(summary.already_present, 1);
    assert_eq!(summary.skipped_blank, 1);
    assert_eq!(summary.http_errors, 1);
    assert_eq!(summary.failed, 1);
    assert!(!summary.rate_limited);
    assert_eq!(source.call_count(), 4);

    assert_eq!(
        std::fs::read(dir.path().join("0704.0001.pdf")).unwrap(),
        b"%PDF-1.4 one"
    );
    assert_eq!(std::fs::read(dir.path().join("0704.0002.pdf")).unwrap(), b"old");
    assert!(dir.path().join("hep-ph_0307015.pdf").exists());
    assert!(!dir.path().join("0704.0003.pdf").exists());

    assert!(statuses.contains(&("0704.0003".to_string(), ItemStatus::HttpStatus(404))));

    // two successes at 3s each plus one transport error at 5s
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(11) && elapsed < Duration::from_secs(12));
}

#[tokio::test(start_paused = true)]
async fn forbidden_stops_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new(&[
        ("0704.0001", Scripted::Pdf(b"%PDF")),
        ("0704.0002", Scripted::Forbidden),
        ("0704.0003", Scripted::Pdf(b"%PDF")),
    ]);

    let summary = download_papers(
        &ids(&["0704.0001", "0704.0002", "0704.0003"]),
        dir.path(),
        &source,
        &DownloadConfig::default(),
        |_, _| {},
    )
    .await
    .unwrap();

    assert!(summary.rate_limited);
    assert_eq!(summary.downloaded, 1);
    assert_eq!(source.call_count(), 2);
    assert!(!dir.path().join("0704.0003.pdf").exists());
}

#[tokio::test(start_paused = true)]
async fn limit_caps_new_downloads() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new(&[
        ("a", Scripted::Pdf(b"1")),
        ("b", Scripted::Pdf(b"2")),
        ("c", Scripted::Pdf(b"3")),
    ]);
    let config = DownloadConfig {
        limit: Some(2),
        ..Default::default()
    };

    let summary = download_papers(&ids(&["a", "b", "c"]), dir.path(), &source, &config, |_, _| {})
        .await
        .unwrap();

    assert_eq!(summary.downloaded, 2);
    assert!(summary.limit_reached);
    assert_eq!(*source.requested.lock().unwrap(), vec!["a", "b"]);
}
