//! Per-category reservoir sampling over the raw arXiv metadata snapshot.
//!
//! The snapshot is far too large to hold in memory, so each target category
//! keeps a fixed-capacity reservoir (Algorithm R) filled in one streaming
//! pass. Every eligible record seen for a category ends up in its bucket
//! with probability `capacity / seen`, independent of stream order.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Deserialize;

use pdftitle_core::GoldPaperRecord;

use crate::CorpusError;

/// Two-digit year prefixes accepted in new-style ids (2007–2026).
pub const MIN_YEAR_PREFIX: u16 = 7;
pub const MAX_YEAR_PREFIX: u16 = 26;

/// Major arXiv sections sampled by default.
pub const DEFAULT_CATEGORIES: &[&str] = &["cs", "physics", "math", "q-bio", "q-fin"];
pub const DEFAULT_SAMPLES_PER_CATEGORY: usize = 1000;

/// One line of the raw metadata snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataRecord {
    pub id: String,
    pub title: String,
    pub authors: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub categories: String,
    #[serde(rename = "journal-ref", default)]
    pub journal_ref: Option<String>,
}

/// Why a well-formed record was not offered to any reservoir.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// No journal reference, i.e. never formally published.
    NoJournalRef,
    /// Pre-2007 `archive/YYMMNNN` identifier.
    LegacyId,
    /// Year prefix outside `MIN_YEAR_PREFIX..=MAX_YEAR_PREFIX`.
    YearOutOfRange,
    /// None of the record's category tags starts with a target category.
    NoMatchingCategory,
}

/// Calendar year encoded in a new-style `YYMM.number` id.
///
/// The id must have a dot and a purely numeric part before it; the first
/// two digits of that part are the year.
pub fn new_style_year(id: &str) -> Result<u16, Rejection> {
    let mut parts = id.split('.');
    let prefix = parts.next().unwrap_or_default();
    if parts.next().is_none() || prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_digit())
    {
        return Err(Rejection::LegacyId);
    }
    let yy: u16 = prefix[..prefix.len().min(2)]
        .parse()
        .map_err(|_| Rejection::LegacyId)?;
    if !(MIN_YEAR_PREFIX..=MAX_YEAR_PREFIX).contains(&yy) {
        return Err(Rejection::YearOutOfRange);
    }
    Ok(2000 + yy)
}

/// Apply the eligibility filters in order, short-circuiting, and return the
/// derived year.
pub fn check_eligibility(record: &MetadataRecord) -> Result<u16, Rejection> {
    let has_journal = record
        .journal_ref
        .as_deref()
        .is_some_and(|j| !j.trim().is_empty());
    if !has_journal {
        return Err(Rejection::NoJournalRef);
    }
    new_style_year(record.id.trim())
}

/// Fixed-capacity uniform sample of a stream (Algorithm R).
#[derive(Debug, Clone)]
pub struct Reservoir<T> {
    capacity: usize,
    seen: u64,
    items: Vec<T>,
}

impl<T> Reservoir<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seen: 0,
            items: Vec::with_capacity(capacity.min(4096)),
        }
    }

    /// Offer the next stream item.
    ///
    /// Appends while there is room; afterwards draws `j` uniformly from
    /// `[0, seen)` and replaces slot `j` when `j < capacity`.
    pub fn offer(&mut self, item: T, rng: &mut fastrand::Rng) {
        self.seen += 1;
        if self.items.len() < self.capacity {
            self.items.push(item);
            return;
        }
        let j = rng.u64(0..self.seen);
        if j < self.capacity as u64 {
            self.items[j as usize] = item;
        }
    }

    pub fn seen(&self) -> u64 {
        self.seen
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// Sampler settings. Category order matters: a record goes to the first
/// listed category that any of its tags starts with.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    pub categories: Vec<String>,
    pub samples_per_category: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            samples_per_category: DEFAULT_SAMPLES_PER_CATEGORY,
        }
    }
}

/// Counters from one sampling pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleStats {
    pub lines_read: u64,
    pub malformed: u64,
    pub no_journal_ref: u64,
    pub legacy_id: u64,
    pub year_out_of_range: u64,
    pub no_matching_category: u64,
    /// `(category, records seen, records kept)` in configured order.
    pub per_category: Vec<(String, u64, usize)>,
}

impl SampleStats {
    fn reject(&mut self, reason: Rejection) {
        match reason {
            Rejection::NoJournalRef => self.no_journal_ref += 1,
            Rejection::LegacyId => self.legacy_id += 1,
            Rejection::YearOutOfRange => self.year_out_of_range += 1,
            Rejection::NoMatchingCategory => self.no_matching_category += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SampleOutcome {
    /// Union of all buckets, in configured category order.
    pub records: Vec<GoldPaperRecord>,
    pub stats: SampleStats,
}

/// Index of the first target category matched by any of `tags`, plus the
/// matching tag.
fn first_matching_category<'a>(
    categories: &[String],
    tags: &[&'a str],
) -> Option<(usize, &'a str)> {
    categories.iter().enumerate().find_map(|(i, target)| {
        tags.iter()
            .find(|tag| tag.starts_with(target.as_str()))
            .map(|tag| (i, *tag))
    })
}

/// Stream newline-delimited metadata from `reader` into per-category
/// reservoirs.
///
/// Lines that are not valid JSON or lack a required field are logged and
/// skipped. The outcome is fully determined by the input and the state of
/// `rng`.
pub fn sample_corpus<R: BufRead>(
    reader: R,
    config: &SamplerConfig,
    rng: &mut fastrand::Rng,
) -> Result<SampleOutcome, CorpusError> {
    let mut buckets: Vec<Reservoir<GoldPaperRecord>> = config
        .categories
        .iter()
        .map(|_| Reservoir::new(config.samples_per_category))
        .collect();
    let mut stats = SampleStats::default();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        stats.lines_read += 1;

        let record: MetadataRecord = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                stats.malformed += 1;
                tracing::warn!(line = number + 1, error = %e, "skipping malformed metadata record");
                continue;
            }
        };

        let year = match check_eligibility(&record) {
            Ok(year) => year,
            Err(reason) => {
                stats.reject(reason);
                continue;
            }
        };

        let tags: Vec<&str> = record.categories.split_whitespace().collect();
        let Some((bucket, tag)) = first_matching_category(&config.categories, &tags) else {
            stats.reject(Rejection::NoMatchingCategory);
            continue;
        };
        let section = tag.to_string();

        buckets[bucket].offer(
            GoldPaperRecord {
                id: record.id.trim().to_string(),
                title: record.title,
                authors: record.authors,
                abstract_text: record.abstract_text,
                section,
                journal_ref: record.journal_ref,
                year,
                bibtex: None,
            },
            rng,
        );
    }

    stats.per_category = config
        .categories
        .iter()
        .zip(&buckets)
        .map(|(c, b)| (c.clone(), b.seen(), b.len()))
        .collect();

    let records = buckets.into_iter().flat_map(Reservoir::into_items).collect();
    tracing::info!(
        lines = stats.lines_read,
        malformed = stats.malformed,
        "sampling pass complete"
    );
    Ok(SampleOutcome { records, stats })
}

/// [`sample_corpus`] over a metadata file on disk.
pub fn sample_file(
    path: &Path,
    config: &SamplerConfig,
    rng: &mut fastrand::Rng,
) -> Result<SampleOutcome, CorpusError> {
    let file = File::open(path)?;
    sample_corpus(BufReader::new(file), config, rng)
}

/// Record counts keyed by `(section, year)`, for the distribution summary.
pub fn section_year_counts(records: &[GoldPaperRecord]) -> BTreeMap<(String, u16), usize> {
    let mut counts = BTreeMap::new();
    for r in records {
        *counts.entry((r.section.clone(), r.year)).or_insert(0) += 1;
    }
    counts
}
