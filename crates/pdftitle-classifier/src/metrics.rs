//! Held-out evaluation of a binary title classifier.

use std::fmt;

/// Rows are the true class, columns the predicted class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(truth: &[bool], predicted: &[bool]) -> Self {
        let mut m = Self::default();
        for (&t, &p) in truth.iter().zip(predicted) {
            match (t, p) {
                (false, false) => m.true_negative += 1,
                (false, true) => m.false_positive += 1,
                (true, false) => m.false_negative += 1,
                (true, true) => m.true_positive += 1,
            }
        }
        m
    }

    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl ClassMetrics {
    fn new(correct: usize, predicted: usize, support: usize) -> Self {
        let precision = ratio(correct, predicted);
        let recall = ratio(correct, support);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            f1,
            support,
        }
    }
}

/// Per-class precision/recall/F1 plus accuracy and averages.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub other: ClassMetrics,
    pub title: ClassMetrics,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    pub confusion: ConfusionMatrix,
}

impl ClassificationReport {
    pub fn new(truth: &[bool], predicted: &[bool]) -> Self {
        let m = ConfusionMatrix::from_predictions(truth, predicted);
        let other = ClassMetrics::new(
            m.true_negative,
            m.true_negative + m.false_negative,
            m.true_negative + m.false_positive,
        );
        let title = ClassMetrics::new(
            m.true_positive,
            m.true_positive + m.false_positive,
            m.true_positive + m.false_negative,
        );
        let total = m.total();

        let macro_avg = ClassMetrics {
            precision: (other.precision + title.precision) / 2.0,
            recall: (other.recall + title.recall) / 2.0,
            f1: (other.f1 + title.f1) / 2.0,
            support: total,
        };
        let weigh = |a: f64, b: f64| {
            if total == 0 {
                0.0
            } else {
                (a * other.support as f64 + b * title.support as f64) / total as f64
            }
        };
        let weighted_avg = ClassMetrics {
            precision: weigh(other.precision, title.precision),
            recall: weigh(other.recall, title.recall),
            f1: weigh(other.f1, title.f1),
            support: total,
        };

        Self {
            other,
            title,
            accuracy: ratio(m.true_negative + m.true_positive, total),
            macro_avg,
            weighted_avg,
            confusion: m,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let row = |f: &mut fmt::Formatter<'_>, name: &str, m: &ClassMetrics| {
            writeln!(
                f,
                "{name:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.precision, m.recall, m.f1, m.support
            )
        };
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        row(f, "OTHER", &self.other)?;
        row(f, "TITLE", &self.title)?;
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.confusion.total()
        )?;
        row(f, "macro avg", &self.macro_avg)?;
        row(f, "weighted avg", &self.weighted_avg)?;
        writeln!(f)?;
        writeln!(f, "Confusion matrix (rows = true, cols = predicted):")?;
        writeln!(f, "{:>12} {:>9} {:>9}", "", "OTHER", "TITLE")?;
        writeln!(
            f,
            "{:>12} {:>9} {:>9}",
            "OTHER", self.confusion.true_negative, self.confusion.false_positive
        )?;
        write!(
            f,
            "{:>12} {:>9} {:>9}",
            "TITLE", self.confusion.false_negative, self.confusion.true_positive
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_class_metrics() {
        // 6 OTHER, 4 TITLE; one title missed, one other flagged as title
        let truth = [false, false, false, false, false, false, true, true, true, true];
        let pred = [false, false, false, false, false, true, true, true, true, false];
        let report = ClassificationReport::new(&truth, &pred);

        assert_eq!(
            report.confusion,
            ConfusionMatrix {
                true_negative: 5,
                false_positive: 1,
                false_negative: 1,
                true_positive: 3,
            }
        );
        assert!((report.title.precision - 0.75).abs() < 1e-12);
        assert!((report.title.recall - 0.75).abs() < 1e-12);
        assert!((report.other.precision - 5.0 / 6.0).abs() < 1e-12);
        assert_eq!(report.title.support, 4);
        assert!((report.accuracy - 0.8).abs() < 1e-12);
        assert_eq!(report.weighted_avg.support, 10);
    }

    #[test]
    fn no_predicted_titles_gives_zero_not_nan() {
        let truth = [false, true];
        let pred = [false, false];
        let report = ClassificationReport::new(&truth, &pred);
        assert_eq!(report.title.precision, 0.0);
        assert_eq!(report.title.f1, 0.0);
        assert!(report.macro_avg.precision.is_finite());
    }

    #[test]
    fn display_lists_both_classes() {
        let report = ClassificationReport::new(&[false, true], &[false, true]);
        let text = report.to_string();
        assert!(text.contains("TITLE"));
        assert!(text.contains("weighted avg"));
        assert!(text.contains("1.00"));
    }
}
