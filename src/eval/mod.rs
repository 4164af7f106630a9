//! Eval module - classification metrics

mod confusion;
mod roc;

pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use roc::{RocCurve, RocPoint};

/// Errors raised while scoring predictions.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("no labels to evaluate")]
    Empty,

    #[error("{truth} reference labels but {predicted} predictions")]
    LengthMismatch { truth: usize, predicted: usize },

    #[error("label {label} outside the {n_classes} known classes")]
    UnknownClass { label: usize, n_classes: usize },

    #[error("ROC needs both classes, got {positives} positives and {negatives} negatives")]
    SingleClass { positives: usize, negatives: usize },

    #[error("score at row {row} is not finite")]
    NonFiniteScore { row: usize },
}
