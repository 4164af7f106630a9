//! Confusion matrix and per-class classification metrics.

use std::fmt;

use serde::Serialize;

use crate::eval::EvalError;

/// `matrix[predicted][reference]` counts for a labelled test set.
#[derive(Debug, Clone, Serialize)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
    class_names: Vec<String>,
}

/// One-vs-rest metrics for a single class.
#[derive(Debug, Clone, Serialize)]
pub struct ClassMetrics {
    pub class: String,
    /// TP / (TP + FP); 0.0 when the class is never predicted.
    pub precision: f64,
    /// TP / (TP + FN), a.k.a. sensitivity.
    pub recall: f64,
    /// TN / (TN + FP).
    pub specificity: f64,
    pub f1: f64,
    /// Reference rows of this class.
    pub support: usize,
}

impl ConfusionMatrix {
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EvalError::Empty`] | no labels |
    /// | [`EvalError::LengthMismatch`] | `truth` and `predicted` differ in length |
    /// | [`EvalError::UnknownClass`] | a label is `>= class_names.len()` |
    pub fn from_labels(
        truth: &[usize],
        predicted: &[usize],
        class_names: &[&str],
    ) -> Result<Self, EvalError> {
        if truth.is_empty() {
            return Err(EvalError::Empty);
        }
        if truth.len() != predicted.len() {
            return Err(EvalError::LengthMismatch {
                truth: truth.len(),
                predicted: predicted.len(),
            });
        }
        let n = class_names.len();
        let mut matrix = vec![vec![0usize; n]; n];
        for (&t, &p) in truth.iter().zip(predicted) {
            let label = t.max(p);
            if label >= n {
                return Err(EvalError::UnknownClass { label, n_classes: n });
            }
            matrix[p][t] += 1;
        }
        Ok(Self {
            matrix,
            class_names: class_names.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Share of rows on the diagonal.
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.matrix.len()).map(|i| self.matrix[i][i]).sum();
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        }
    }

    pub fn count(&self, predicted: usize, reference: usize) -> usize {
        self.matrix[predicted][reference]
    }

    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        let n = self.matrix.len();
        let total = self.total();
        (0..n)
            .map(|c| {
                let tp = self.matrix[c][c];
                let predicted_c: usize = self.matrix[c].iter().sum();
                let support: usize = (0..n).map(|p| self.matrix[p][c]).sum();
                let fp = predicted_c - tp;
                let tn = total - support - fp;

                let precision = ratio(tp, predicted_c);
                let recall = ratio(tp, support);
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    class: self.class_names[c].clone(),
                    precision,
                    recall,
                    specificity: ratio(tn, tn + fp),
                    f1,
                    support,
                }
            })
            .collect()
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .class_names
            .iter()
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max(10);

        writeln!(f, "{:>width$}  Reference", "Prediction")?;
        write!(f, "{:>width$}", "")?;
        for name in &self.class_names {
            write!(f, " {name:>width$}")?;
        }
        writeln!(f)?;
        for (name, row) in self.class_names.iter().zip(&self.matrix) {
            write!(f, "{name:>width$}")?;
            for count in row {
                write!(f, " {count:>width$}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: [&str; 2] = ["Rejected", "Approved"];

    #[test]
    fn counts_and_accuracy() {
        let truth = [0, 0, 0, 1, 1, 1, 1, 0];
        let predicted = [0, 1, 0, 1, 1, 0, 1, 0];
        let cm = ConfusionMatrix::from_labels(&truth, &predicted, &NAMES).unwrap();

        assert_eq!(cm.total(), 8);
        assert_eq!(cm.count(0, 0), 3);
        assert_eq!(cm.count(1, 0), 1);
        assert_eq!(cm.count(0, 1), 1);
        assert_eq!(cm.count(1, 1), 3);
        assert!((cm.accuracy() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn class_metrics_for_approved() {
        let truth = [0, 0, 0, 0, 1, 1, 1, 1, 1, 1];
        let predicted = [0, 0, 0, 1, 1, 1, 1, 1, 0, 0];
        let cm = ConfusionMatrix::from_labels(&truth, &predicted, &NAMES).unwrap();
        let approved = &cm.class_metrics()[1];

        // tp 4, fp 1, fn 2, tn 3
        assert_eq!(approved.class, "Approved");
        assert_eq!(approved.support, 6);
        assert!((approved.precision - 0.8).abs() < 1e-12);
        assert!((approved.recall - 4.0 / 6.0).abs() < 1e-12);
        assert!((approved.specificity - 0.75).abs() < 1e-12);
    }

    #[test]
    fn never_predicted_class_has_zero_precision() {
        let cm = ConfusionMatrix::from_labels(&[0, 1], &[0, 0], &NAMES).unwrap();
        let approved = &cm.class_metrics()[1];
        assert_eq!(approved.precision, 0.0);
        assert_eq!(approved.f1, 0.0);
    }

    #[test]
    fn display_has_class_names() {
        let cm = ConfusionMatrix::from_labels(&[0, 1], &[0, 1], &NAMES).unwrap();
        let text = cm.to_string();
        assert!(text.contains("Prediction"));
        assert!(text.contains("Rejected"));
        assert!(text.contains("Approved"));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            ConfusionMatrix::from_labels(&[], &[], &NAMES),
            Err(EvalError::Empty)
        ));
        assert!(matches!(
            ConfusionMatrix::from_labels(&[0], &[0, 1], &NAMES),
            Err(EvalError::LengthMismatch { .. })
        ));
        assert!(matches!(
            ConfusionMatrix::from_labels(&[2], &[0], &NAMES),
            Err(EvalError::UnknownClass { label: 2, .. })
        ));
    }
}
