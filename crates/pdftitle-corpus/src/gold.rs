//! Gold-standard file maintenance.

use std::io::BufWriter;
use std::path::Path;

use pdftitle_core::records::{read_gold_records, write_jsonl};
use pdftitle_core::{BibtexEntry, GoldPaperRecord};

use crate::CorpusError;

/// Write gold records to `path`, replacing it atomically.
///
/// The records go to a temporary file in the same directory which is then
/// renamed over the target, so readers never observe a partial file.
pub fn write_gold(path: &Path, records: &[GoldPaperRecord]) -> Result<usize, CorpusError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    let written = write_jsonl(BufWriter::new(tmp.as_file_mut()), records)?;
    tmp.persist(path).map_err(|e| CorpusError::Io(e.error))?;
    Ok(written)
}

/// Attach a rendered citation entry to every record in the gold file.
///
/// Refuses to rewrite a file containing lines it could not decode, since
/// those lines would be lost.
pub fn enrich_gold_standard(path: &Path) -> Result<usize, CorpusError> {
    let parsed = read_gold_records(path)?;
    if parsed.malformed > 0 {
        return Err(CorpusError::Malformed {
            path: path.display().to_string(),
            count: parsed.malformed,
        });
    }

    let mut records = parsed.records;
    for record in &mut records {
        record.bibtex = Some(BibtexEntry::from_record(record).to_string());
    }
    let written = write_gold(path, &records)?;
    tracing::info!(path = %path.display(), records = written, "added citation entries");
    Ok(written)
}

/// Look up one record by id.
pub fn find_record(path: &Path, paper_id: &str) -> Result<Option<GoldPaperRecord>, CorpusError> {
    let parsed = read_gold_records(path)?;
    Ok(parsed.records.into_iter().find(|r| r.id == paper_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, journal: Option<&str>) -> GoldPaperRecord {
        GoldPaperRecord {
            id: id.into(),
            title: "Sparsity-certifying Graph Decompositions".into(),
            authors: "Ileana Streinu, Louis Theran".into(),
            abstract_text: String::new(),
            section: "math.CO".into(),
            journal_ref: journal.map(String::from),
            year: 2007,
            bibtex: None,
        }
    }

    #[test]
    fn enrich_adds_bibtex_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gold.jsonl");
        write_gold(
            &path,
            &[
                record("0704.0002", Some("Graphs and Combinatorics")),
                record("0704.0003", None),
            ],
        )
        .unwrap();

        assert_eq!(enrich_gold_standard(&path).unwrap(), 2);

        let enriched = read_gold_records(&path).unwrap().records;
        let first = enriched[0].bibtex.as_deref().unwrap();
        assert!(first.starts_with("@article{Streinu2007,"));
        assert!(first.contains("journal = {Graphs and Combinatorics}"));
        let second = enriched[1].bibtex.as_deref().unwrap();
        assert!(second.contains("journal = {arXiv preprint arXiv:0704.0003}"));
    }

    #[test]
    fn enrich_refuses_files_with_bad_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gold.jsonl");
        write_gold(&path, &[record("0704.0002", None)]).unwrap();
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("{broken\n");
        std::fs::write(&path, &content).unwrap();

        assert!(matches!(
            enrich_gold_standard(&path),
            Err(CorpusError::Malformed { count: 1, .. })
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), content);
    }

    #[test]
    fn find_record_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("gold.jsonl");
        write_gold(&path, &[record("0704.0002", None)]).unwrap();
        assert!(find_record(&path, "0704.0002").unwrap().is_some());
        assert!(find_record(&path, "0704.9999").unwrap().is_none());
    }
}
