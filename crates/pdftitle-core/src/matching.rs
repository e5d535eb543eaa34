/// Lines shorter than this (after trimming) never count as title text.
pub const MIN_LINE_CHARS: usize = 4;

/// Collapse every run of whitespace into one space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lower-case `text` and drop all whitespace.
///
/// PDF extraction inserts or loses spaces unpredictably (`"Neu ral"`,
/// `"DeepLearning"`), so comparisons happen on the squashed form.
pub fn squash(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether an extracted line is part of a paper's known title.
///
/// True iff the line has at least [`MIN_LINE_CHARS`] characters after
/// trimming and its squashed form is a contiguous substring of the squashed
/// title.
pub fn is_line_in_title(line_text: &str, true_title: &str) -> bool {
    if line_text.trim().chars().count() < MIN_LINE_CHARS {
        return false;
    }
    squash(true_title).contains(&squash(line_text))
}
