use std::fmt;

use crate::records::GoldPaperRecord;

/// Citation key: the first author's cleaned last name followed by the year.
///
/// The last name is the final word of the text before the first comma, with
/// everything that is not alphanumeric removed. An empty or unparseable
/// author string yields `Unknown<year>`.
pub fn cite_key(authors: &str, year: u16) -> String {
    let name = first_author_last_name(authors).unwrap_or_else(|| "Unknown".to_string());
    format!("{name}{year}")
}

fn first_author_last_name(authors: &str) -> Option<String> {
    let first_author = authors.split(',').next()?;
    let last_word = first_author.split_whitespace().last()?;
    let cleaned: String = last_word.chars().filter(|c| c.is_alphanumeric()).collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// A rendered `@article` entry for one gold record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibtexEntry {
    pub cite_key: String,
    pub author: String,
    pub title: String,
    pub journal: String,
    pub year: u16,
    pub note: String,
}

impl BibtexEntry {
    pub fn from_record(record: &GoldPaperRecord) -> Self {
        let journal = match record.journal_ref.as_deref().map(str::trim) {
            Some(j) if !j.is_empty() => j.to_string(),
            _ => format!("arXiv preprint arXiv:{}", record.id),
        };
        Self {
            cite_key: cite_key(&record.authors, record.year),
            author: record.authors.clone(),
            title: record.title.clone(),
            journal,
            year: record.year,
            note: format!("arXiv:{}", record.id),
        }
    }
}

impl fmt::Display for BibtexEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "@article{{{},", self.cite_key)?;
        writeln!(f, "  author = {{{}}},", self.author)?;
        writeln!(f, "  title = {{{}}},", self.title)?;
        writeln!(f, "  journal = {{{}}},", self.journal)?;
        writeln!(f, "  year = {{{}}},", self.year)?;
        writeln!(f, "  note = {{{}}}", self.note)?;
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(authors: &str, journal_ref: Option<&str>) -> GoldPaperRecord {
        GoldPaperRecord {
            id: "0704.0001".into(),
            title: "Calculation of prompt diphoton production".into(),
            authors: authors.into(),
            abstract_text: String::new(),
            section: "hep-ph".into(),
            journal_ref: journal_ref.map(String::from),
            year: 2007,
            bibtex: None,
        }
    }

    #[test]
    fn cite_key_uses_last_word_before_first_comma() {
        assert_eq!(cite_key("Smith, J. and Doe, A.", 1999), "Smith1999");
        assert_eq!(cite_key("C. Bal\\'azs, E. L. Berger", 2007), "Balazs2007");
    }

    #[test]
    fn cite_key_falls_back_to_unknown() {
        assert_eq!(cite_key("", 2010), "Unknown2010");
        assert_eq!(cite_key("   , Doe", 2010), "Unknown2010");
        assert_eq!(cite_key("{\\'{}}", 2010), "Unknown2010");
    }

    #[test]
    fn renders_article_with_journal_ref() {
        let entry = BibtexEntry::from_record(&record(
            "P. Nadolsky, C.-P. Yuan",
            Some("Phys.Rev.D76:013009,2007"),
        ));
        let text = entry.to_string();
        assert_eq!(
            text,
            "@article{Nadolsky2007,\n  author = {P. Nadolsky, C.-P. Yuan},\n  title = {Calculation of prompt diphoton production},\n  journal = {Phys.Rev.D76:013009,2007},\n  year = {2007},\n  note = {arXiv:0704.0001}\n}"
        );
    }

    #[test]
    fn missing_journal_synthesizes_preprint_label() {
        let entry = BibtexEntry::from_record(&record("A. Author", None));
        assert_eq!(entry.journal, "arXiv preprint arXiv:0704.0001");
        let blank = BibtexEntry::from_record(&record("A. Author", Some("  ")));
        assert_eq!(blank.journal, "arXiv preprint arXiv:0704.0001");
    }
}
