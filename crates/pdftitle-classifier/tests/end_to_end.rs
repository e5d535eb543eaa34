//! Weak labels → training → saved artifact → inference on a new page.

use std::path::Path;

use pdftitle_classifier::{
    ClassifierError, ForestParams, TitlePredictor, TrainingConfig, load_model, save_model, train,
};
use pdftitle_core::backend::BOLD_FLAG;
use pdftitle_core::mock::{MockBackend, MockPage};
use pdftitle_core::{PageLayout, RawBlock, RawLine, RawSpan, TrainingRow, extract_first_page_lines};

fn first_page(title: &[&str], authors: &str, body_lines: usize, title_size: f64) -> PageLayout {
    let span = |text: &str, size: f64, flags: u32, top: f64| {
        RawLine::new(vec![RawSpan::new(text, size, flags, [72.0, top, 540.0, top + size])])
    };
    let mut header = vec![span("Preprint under review", 8.0, 0, 30.0)];
    let mut top = 95.0;
    for line in title {
        header.push(span(line, title_size, BOLD_FLAG, top));
        top += title_size + 4.0;
    }
    header.push(span(authors, 11.0, 0, top + 20.0));

    let body = (0..body_lines)
        .map(|i| span(&format!("Body paragraph line number {i}"), 10.0, 0, 300.0 + 12.0 * i as f64))
        .collect();

    PageLayout {
        width: 612.0,
        height: 792.0,
        blocks: vec![RawBlock::text(header), RawBlock::image(), RawBlock::text(body)],
    }
}

#[test]
fn trained_model_recovers_an_unseen_title() {
    let titles: Vec<(Vec<String>, String)> = (0..25)
        .map(|p| {
            let lines = vec![
                format!("Learning Structured Models {p}"),
                format!("for Document Layout {p}"),
            ];
            let full = lines.join(" ");
            (lines, full)
        })
        .collect();

    let mut backend = MockBackend::new();
    for (p, (lines, _)) in titles.iter().enumerate() {
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let size = 15.0 + (p % 4) as f64;
        backend = backend.with_layout(
            format!("{p}.pdf"),
            first_page(&refs, "A. Author, B. Author", 8 + p % 5, size),
        );
    }

    let mut rows: Vec<TrainingRow> = Vec::new();
    for (p, (_, full)) in titles.iter().enumerate() {
        let lines = extract_first_page_lines(Path::new(&format!("{p}.pdf")), &backend).unwrap();
        rows.extend(
            lines
                .into_iter()
                .filter_map(|l| TrainingRow::from_line(&l.labeled_against(full))),
        );
    }
    assert_eq!(rows.iter().filter(|r| r.is_title()).count(), 50);

    let config = TrainingConfig {
        forest: ForestParams {
            n_trees: 30,
            ..Default::default()
        },
        ..Default::default()
    };
    let outcome = train(&rows, &config).unwrap();
    assert!(outcome.report.title.recall > 0.9, "{}", outcome.report);

    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("title_classifier_rf.json");
    save_model(&model_path, &outcome.artifact).unwrap();
    let predictor = TitlePredictor::new(load_model(&model_path).unwrap());

    let unseen = MockBackend::new()
        .with_layout(
            "new.pdf",
            first_page(
                &["Graph Neural Networks for", "Citation Recommendation"],
                "C. Writer",
                10,
                16.5,
            ),
        )
        .with_page("empty.pdf", MockPage::Empty);

    let prediction = predictor.predict_pdf(Path::new("new.pdf"), &unseen).unwrap();
    assert_eq!(prediction.title, "Graph Neural Networks for Citation Recommendation");
    assert!(!prediction.used_fallback);

    assert!(matches!(
        predictor.predict_pdf(Path::new("empty.pdf"), &unseen),
        Err(ClassifierError::Backend(_))
    ));
}
