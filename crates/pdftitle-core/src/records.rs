//! Persisted record types and newline-delimited JSON I/O.
//!
//! Everything crossing a file boundary is decoded into one of the typed
//! records here; malformed lines are logged and counted, never fatal.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::matching::normalize_whitespace;
use crate::{LineLabel, PdfTextLine};

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid record: {0}")]
    Invalid(String),
}

/// Bibliographic ground truth for one sampled paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldPaperRecord {
    pub id: String,
    pub title: String,
    pub authors: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    pub section: String,
    #[serde(rename = "journal-ref", default)]
    pub journal_ref: Option<String>,
    #[serde(deserialize_with = "deserialize_year")]
    pub year: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bibtex: Option<String>,
}

impl GoldPaperRecord {
    /// Reject records that decode but break the gold-standard invariants.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.id.trim().is_empty() {
            return Err(RecordError::Invalid("empty id".into()));
        }
        if !(1000..=9999).contains(&self.year) {
            return Err(RecordError::Invalid(format!(
                "{}: year {} is not four digits",
                self.id, self.year
            )));
        }
        Ok(())
    }
}

/// Years are written as integers but older gold files carry `"2007"`.
fn deserialize_year<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum YearRepr {
        Number(u16),
        Text(String),
    }

    match YearRepr::deserialize(deserializer)? {
        YearRepr::Number(y) => Ok(y),
        YearRepr::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// One labeled line flattened for model training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRow {
    pub text: String,
    pub page_number: u32,
    pub line_index: usize,
    pub y_position: f64,
    pub font_size: f64,
    pub is_bold: bool,
    pub label: LineLabel,
}

impl TrainingRow {
    /// Flatten a labeled line. Returns `None` for unlabeled lines.
    pub fn from_line(line: &PdfTextLine) -> Option<Self> {
        Some(Self {
            text: line.text.clone(),
            page_number: line.page_number,
            line_index: line.line_index,
            y_position: line.y_position,
            font_size: line.font_size,
            is_bold: line.is_bold,
            label: line.label?,
        })
    }

    pub fn is_title(&self) -> bool {
        self.label.is_title()
    }
}

/// Records decoded from a JSONL source plus the number of lines skipped.
#[derive(Debug, Clone)]
pub struct JsonlRecords<T> {
    pub records: Vec<T>,
    pub malformed: usize,
}

/// Decode one record per non-blank line. Lines that fail to decode are
/// logged and counted; only I/O failures abort.
pub fn parse_jsonl<T: DeserializeOwned, R: BufRead>(
    reader: R,
) -> Result<JsonlRecords<T>, RecordError> {
    let mut records = Vec::new();
    let mut malformed = 0;
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                malformed += 1;
                tracing::warn!(line = number + 1, error = %e, "skipping malformed record");
            }
        }
    }
    Ok(JsonlRecords { records, malformed })
}

pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<JsonlRecords<T>, RecordError> {
    let file = File::open(path)?;
    parse_jsonl(BufReader::new(file))
}

/// Write one compact JSON document per line.
pub fn write_jsonl<'a, T, W, I>(mut writer: W, records: I) -> Result<usize, RecordError>
where
    T: Serialize + 'a,
    W: Write,
    I: IntoIterator<Item = &'a T>,
{
    let mut written = 0;
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Read gold records, additionally dropping (and counting) records that
/// decode but fail [`GoldPaperRecord::validate`].
pub fn read_gold_records(path: &Path) -> Result<JsonlRecords<GoldPaperRecord>, RecordError> {
    let JsonlRecords { records, malformed } = read_jsonl::<GoldPaperRecord>(path)?;
    let mut valid = Vec::with_capacity(records.len());
    let mut rejected = 0;
    for record in records {
        match record.validate() {
            Ok(()) => valid.push(record),
            Err(e) => {
                rejected += 1;
                tracing::warn!(error = %e, "skipping invalid gold record");
            }
        }
    }
    Ok(JsonlRecords {
        records: valid,
        malformed: malformed + rejected,
    })
}

/// Map of paper id → whitespace-normalized title from a gold JSONL file.
pub fn load_title_map(path: &Path) -> Result<HashMap<String, String>, RecordError> {
    #[derive(Deserialize)]
    struct IdTitle {
        id: String,
        title: String,
    }

    let parsed = read_jsonl::<IdTitle>(path)?;
    Ok(parsed
        .records
        .into_iter()
        .map(|r| (r.id, normalize_whitespace(&r.title)))
        .collect())
}
