//! Stratified k-fold cross-validation for choosing the logistic penalty.

use ndarray::{Array1, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::model::design::DesignMatrix;
use crate::model::error::ModelError;
use crate::model::logistic::{binomial_deviance, validate_training, FittedLogistic, LogisticRegression};

/// Held-out performance of one penalty value.
#[derive(Debug, Clone, Serialize)]
pub struct LambdaScore {
    pub lambda: f64,
    /// Mean held-out binomial deviance per row, averaged over folds.
    pub mean_deviance: f64,
    /// Mean held-out accuracy, averaged over folds.
    pub mean_accuracy: f64,
}

/// Result of [`LogisticCv::fit`]: the scores and the refitted model.
#[derive(Debug, Clone)]
pub struct CvLogistic {
    pub scores: Vec<LambdaScore>,
    pub best_lambda: f64,
    pub model: FittedLogistic,
    pub n_folds: usize,
}

/// Cross-validated logistic regression over a penalty grid.
#[derive(Debug, Clone)]
pub struct LogisticCv {
    n_folds: usize,
    lambda_grid: Vec<f64>,
    seed: u64,
}

impl LogisticCv {
    /// # Errors
    ///
    /// [`ModelError::InvalidParameter`] when `n_folds < 2` or the grid is empty
    /// or holds a negative value.
    pub fn new(n_folds: usize, lambda_grid: Vec<f64>) -> Result<Self, ModelError> {
        if n_folds < 2 {
            return Err(ModelError::InvalidParameter(format!(
                "n_folds must be at least 2, got {n_folds}"
            )));
        }
        if lambda_grid.is_empty() || lambda_grid.iter().any(|l| !(*l >= 0.0)) {
            return Err(ModelError::InvalidParameter(format!(
                "lambda grid must be non-empty and non-negative, got {lambda_grid:?}"
            )));
        }
        let mut lambda_grid = lambda_grid;
        lambda_grid.sort_by(f64::total_cmp);
        Ok(Self {
            n_folds,
            lambda_grid,
            seed: 42,
        })
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Score every lambda by k-fold held-out deviance, then refit the best on all rows.
    ///
    /// Ties go to the larger lambda.
    #[instrument(skip_all, fields(n_folds = self.n_folds, n_rows = design.n_rows()))]
    pub fn fit(&self, design: &DesignMatrix) -> Result<CvLogistic, ModelError> {
        validate_training(design)?;
        let folds = self.stratified_folds(&design.y)?;

        let mut scores = Vec::with_capacity(self.lambda_grid.len());
        for &lambda in &self.lambda_grid {
            let estimator = LogisticRegression::new().with_lambda(lambda);
            let mut deviances = Vec::with_capacity(self.n_folds);
            let mut accuracies = Vec::with_capacity(self.n_folds);

            for fold in 0..self.n_folds {
                let (train_rows, test_rows): (Vec<usize>, Vec<usize>) =
                    (0..design.n_rows()).partition(|&row| folds[row] != fold);

                let train = subset(design, &train_rows);
                let held_out = subset(design, &test_rows);

                // A rare level can be absent from a fold's training rows.
                let varying = varying_columns(&train);
                if varying.len() < design.n_features() {
                    debug!(
                        fold,
                        dropped = design.n_features() - varying.len(),
                        "constant columns left out of fold fit"
                    );
                }
                let train = select_columns(&train, &varying);
                let held_out = select_columns(&held_out, &varying);

                let model = estimator.fit(&train)?;
                let proba = model.predict_proba(&held_out.x)?;
                let truth: Array1<f64> = held_out.y.iter().map(|&c| c as f64).collect();

                deviances.push(binomial_deviance(&truth, &proba) / held_out.n_rows() as f64);
                let correct = proba
                    .iter()
                    .zip(&held_out.y)
                    .filter(|(&p, &y)| usize::from(p >= 0.5) == y)
                    .count();
                accuracies.push(correct as f64 / held_out.n_rows() as f64);
            }

            let score = LambdaScore {
                lambda,
                mean_deviance: deviances.iter().sum::<f64>() / self.n_folds as f64,
                mean_accuracy: accuracies.iter().sum::<f64>() / self.n_folds as f64,
            };
            info!(
                lambda,
                deviance = score.mean_deviance,
                accuracy = score.mean_accuracy,
                "lambda scored"
            );
            scores.push(score);
        }

        let best_lambda = scores
            .iter()
            .fold(None::<&LambdaScore>, |best, s| match best {
                Some(b) if b.mean_deviance < s.mean_deviance => Some(b),
                _ => Some(s),
            })
            .map_or(0.0, |s| s.lambda);

        let model = LogisticRegression::new()
            .with_lambda(best_lambda)
            .fit(design)?;
        info!(best_lambda, "logistic model refitted on full training set");

        Ok(CvLogistic {
            scores,
            best_lambda,
            model,
            n_folds: self.n_folds,
        })
    }

    /// Shuffle within each class, then deal rows round-robin across folds.
    fn stratified_folds(&self, labels: &[usize]) -> Result<Vec<usize>, ModelError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let n_classes = labels.iter().max().map_or(0, |&m| m + 1);

        let mut class_indices: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
        for (row, &label) in labels.iter().enumerate() {
            class_indices[label].push(row);
        }

        for (class, indices) in class_indices.iter().enumerate() {
            if !indices.is_empty() && indices.len() < self.n_folds {
                return Err(ModelError::TooFewSamplesForFolds {
                    class,
                    count: indices.len(),
                    n_folds: self.n_folds,
                });
            }
        }

        let mut assignments = vec![0usize; labels.len()];
        for indices in &mut class_indices {
            indices.shuffle(&mut rng);
            for (j, &row) in indices.iter().enumerate() {
                assignments[row] = j % self.n_folds;
            }
        }
        Ok(assignments)
    }
}

fn subset(design: &DesignMatrix, rows: &[usize]) -> DesignMatrix {
    DesignMatrix {
        x: design.x.select(Axis(0), rows),
        y: rows.iter().map(|&r| design.y[r]).collect(),
        feature_names: design.feature_names.clone(),
    }
}

/// Columns holding at least two distinct values.
fn varying_columns(design: &DesignMatrix) -> Vec<usize> {
    design
        .x
        .axis_iter(Axis(1))
        .enumerate()
        .filter(|(_, column)| column.iter().any(|&v| v != column[0]))
        .map(|(j, _)| j)
        .collect()
}

fn select_columns(design: &DesignMatrix, columns: &[usize]) -> DesignMatrix {
    DesignMatrix {
        x: design.x.select(Axis(1), columns),
        y: design.y.clone(),
        feature_names: columns
            .iter()
            .map(|&j| design.feature_names[j].clone())
            .collect(),
    }
}
