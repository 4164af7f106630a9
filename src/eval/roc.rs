//! ROC curve and area under it.

use serde::Serialize;

use crate::eval::EvalError;

/// One operating point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RocPoint {
    pub threshold: f64,
    pub fpr: f64,
    pub tpr: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RocCurve {
    points: Vec<RocPoint>,
    auc: f64,
}

impl RocCurve {
    /// Sweep thresholds over the distinct scores from high to low.
    ///
    /// A row counts as positive when `truth[i] == positive`. Rows sharing a
    /// score move the curve in one step, so ties produce a diagonal segment.
    pub fn compute(scores: &[f64], truth: &[usize], positive: usize) -> Result<Self, EvalError> {
        if scores.len() != truth.len() {
            return Err(EvalError::LengthMismatch {
                truth: truth.len(),
                predicted: scores.len(),
            });
        }
        if let Some(row) = scores.iter().position(|s| !s.is_finite()) {
            return Err(EvalError::NonFiniteScore { row });
        }

        let n_pos = truth.iter().filter(|&&t| t == positive).count();
        let n_neg = truth.len() - n_pos;
        if n_pos == 0 || n_neg == 0 {
            return Err(EvalError::SingleClass {
                positives: n_pos,
                negatives: n_neg,
            });
        }

        let mut ranked: Vec<(f64, bool)> = scores
            .iter()
            .zip(truth)
            .map(|(&s, &t)| (s, t == positive))
            .collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut points = vec![RocPoint {
            threshold: f64::INFINITY,
            fpr: 0.0,
            tpr: 0.0,
        }];
        let (mut tp, mut fp) = (0usize, 0usize);
        let mut i = 0;
        while i < ranked.len() {
            let threshold = ranked[i].0;
            while i < ranked.len() && ranked[i].0 == threshold {
                if ranked[i].1 {
                    tp += 1;
                } else {
                    fp += 1;
                }
                i += 1;
            }
            points.push(RocPoint {
                threshold,
                fpr: fp as f64 / n_neg as f64,
                tpr: tp as f64 / n_pos as f64,
            });
        }

        let auc = points
            .windows(2)
            .map(|w| (w[1].fpr - w[0].fpr) * (w[1].tpr + w[0].tpr) / 2.0)
            .sum::<f64>()
            .clamp(0.0, 1.0);

        Ok(Self { points, auc })
    }

    /// From `(0, 0)` to `(1, 1)`, non-decreasing in both rates.
    pub fn points(&self) -> &[RocPoint] {
        &self.points
    }

    pub fn auc(&self) -> f64 {
        self.auc
    }
}
