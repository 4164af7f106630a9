//! Binomial GLM (logit link) fitted by iteratively reweighted least squares.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use statrs::function::logistic::logistic;
use statrs::statistics::Statistics;
use tracing::{debug, warn};

use crate::model::design::DesignMatrix;
use crate::model::error::ModelError;
use crate::model::linalg::cholesky_solve;

/// Fitted probabilities are kept inside `[EPS, 1 - EPS]`.
const PROB_EPS: f64 = 1e-10;

/// Logistic regression configuration.
///
/// Features are standardized with the training mean and standard
/// deviation; the intercept is never penalized.
///
/// | Parameter  | Default |
/// |------------|---------|
/// | `lambda`   | 0.0     |
/// | `max_iter` | 25      |
/// | `tol`      | 1e-8    |
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    lambda: f64,
    max_iter: usize,
    tol: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            lambda: 0.0,
            max_iter: 25,
            tol: 1e-8,
        }
    }

    /// Set the L2 penalty strength (per observation).
    #[must_use]
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Fit on a design matrix.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`ModelError::InvalidParameter`] | `lambda` negative or `max_iter` zero |
    /// | [`ModelError::EmptyDataset`] | zero rows |
    /// | [`ModelError::SingleClass`] | only one label present |
    /// | [`ModelError::NonFiniteValue`] | NaN or infinite feature |
    /// | [`ModelError::ConstantFeature`] | zero-variance feature column |
    /// | [`ModelError::SingularDesign`] | the weighted normal equations are singular |
    pub fn fit(&self, design: &DesignMatrix) -> Result<FittedLogistic, ModelError> {
        if !(self.lambda >= 0.0) || self.max_iter == 0 {
            return Err(ModelError::InvalidParameter(format!(
                "lambda = {}, max_iter = {}",
                self.lambda, self.max_iter
            )));
        }
        validate_training(design)?;

        let n = design.n_rows();
        let (means, scales) = standardization(design)?;
        let z = with_intercept(&standardize(design.x.view(), &means, &scales));
        let y: Array1<f64> = design.y.iter().map(|&c| c as f64).collect();
        let n_params = z.ncols();

        // Start from mu = (y + 0.5) / 2, as glm does.
        let mut mu = y.mapv(|v| (v + 0.5) / 2.0);
        let mut eta = mu.mapv(|m: f64| (m / (1.0 - m)).ln());
        let mut beta = Array1::<f64>::zeros(n_params);
        let mut deviance = f64::INFINITY;
        let mut converged = false;
        let mut iterations = 0;

        for iteration in 0..self.max_iter {
            iterations = iteration + 1;

            let w = mu.mapv(|m| (m * (1.0 - m)).max(PROB_EPS));
            let working = &eta + &((&y - &mu) / &w);

            let zw = &z * &w.view().insert_axis(Axis(1));
            let mut lhs = z.t().dot(&zw);
            let rhs = zw.t().dot(&working);
            let ridge = self.lambda * n as f64;
            for j in 1..n_params {
                lhs[[j, j]] += ridge;
            }

            beta = cholesky_solve(&lhs, &rhs).ok_or(ModelError::SingularDesign { iteration })?;
            eta = z.dot(&beta);
            mu = eta.mapv(|e| logistic(e).clamp(PROB_EPS, 1.0 - PROB_EPS));

            let penalty = ridge * beta.iter().skip(1).map(|b| b * b).sum::<f64>();
            let new_deviance = binomial_deviance(&y, &mu) + penalty;
            let change = (new_deviance - deviance).abs() / (new_deviance.abs() + 0.1);
            deviance = new_deviance;

            if change < self.tol {
                converged = true;
                break;
            }
        }

        if !converged {
            warn!(
                iterations,
                lambda = self.lambda,
                "logistic IRLS did not converge"
            );
        }
        debug!(iterations, deviance, lambda = self.lambda, "logistic fit complete");

        Ok(FittedLogistic {
            intercept: beta[0],
            coefficients: beta.slice(ndarray::s![1..]).to_owned(),
            means,
            scales,
            feature_names: design.feature_names.clone(),
            lambda: self.lambda,
            iterations,
            converged,
        })
    }
}

/// A fitted logistic model. Coefficients live on the standardized scale.
#[derive(Debug, Clone)]
pub struct FittedLogistic {
    intercept: f64,
    coefficients: Array1<f64>,
    means: Array1<f64>,
    scales: Array1<f64>,
    feature_names: Vec<String>,
    lambda: f64,
    iterations: usize,
    converged: bool,
}

impl FittedLogistic {
    /// Probability of class 1 (`Approved`) per row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        if x.ncols() != self.coefficients.len() {
            return Err(ModelError::FeatureCountMismatch {
                expected: self.coefficients.len(),
                got: x.ncols(),
            });
        }
        let z = standardize(x.view(), &self.means, &self.scales);
        Ok((z.dot(&self.coefficients) + self.intercept).mapv(logistic))
    }

    /// Hard labels with a 0.5 threshold.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>, ModelError> {
        Ok(self
            .predict_proba(x)?
            .iter()
            .map(|&p| usize::from(p >= 0.5))
            .collect())
    }

    /// Coefficients on the original feature scale, intercept first.
    pub fn coefficients(&self) -> Vec<(String, f64)> {
        let raw: Vec<f64> = self
            .coefficients
            .iter()
            .zip(self.scales.iter())
            .map(|(b, s)| b / s)
            .collect();
        let intercept = self.intercept
            - raw
                .iter()
                .zip(self.means.iter())
                .map(|(b, m)| b * m)
                .sum::<f64>();

        std::iter::once(("(Intercept)".to_string(), intercept))
            .chain(self.feature_names.iter().cloned().zip(raw))
            .collect()
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }
}

/// Binomial deviance `-2 * log-likelihood` for probabilities `mu`.
pub fn binomial_deviance(y: &Array1<f64>, mu: &Array1<f64>) -> f64 {
    -2.0 * y
        .iter()
        .zip(mu.iter())
        .map(|(&yi, &mi)| {
            let m = mi.clamp(PROB_EPS, 1.0 - PROB_EPS);
            yi * m.ln() + (1.0 - yi) * (1.0 - m).ln()
        })
        .sum::<f64>()
}

pub(crate) fn validate_training(design: &DesignMatrix) -> Result<(), ModelError> {
    if design.n_rows() == 0 {
        return Err(ModelError::EmptyDataset);
    }
    let mut seen = [false; 2];
    for &label in &design.y {
        if let Some(slot) = seen.get_mut(label) {
            *slot = true;
        }
    }
    let n_classes = seen.iter().filter(|&&s| s).count();
    if n_classes < 2 {
        return Err(ModelError::SingleClass { n_classes });
    }
    for ((row, feature), value) in design.x.indexed_iter() {
        if !value.is_finite() {
            return Err(ModelError::NonFiniteValue {
                row,
                feature: design.feature_names[feature].clone(),
            });
        }
    }
    Ok(())
}

fn standardization(design: &DesignMatrix) -> Result<(Array1<f64>, Array1<f64>), ModelError> {
    let mut means = Array1::<f64>::zeros(design.n_features());
    let mut scales = Array1::<f64>::zeros(design.n_features());

    for (j, column) in design.x.axis_iter(Axis(1)).enumerate() {
        let mean = column.iter().mean();
        let sd = if column.len() > 1 {
            column.iter().std_dev()
        } else {
            0.0
        };
        if !(sd > 1e-12) {
            return Err(ModelError::ConstantFeature {
                feature: design.feature_names[j].clone(),
            });
        }
        means[j] = mean;
        scales[j] = sd;
    }
    Ok((means, scales))
}

fn standardize(x: ArrayView2<f64>, means: &Array1<f64>, scales: &Array1<f64>) -> Array2<f64> {
    (&x - &means.view().insert_axis(Axis(0))) / &scales.view().insert_axis(Axis(0))
}

fn with_intercept(x: &Array2<f64>) -> Array2<f64> {
    let mut z = Array2::<f64>::ones((x.nrows(), x.ncols() + 1));
    z.slice_mut(ndarray::s![.., 1..]).assign(x);
    z
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    /// Two noisy features, label driven by the first one.
    fn noisy_design(n: usize, seed: u64) -> DesignMatrix {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut data = Vec::with_capacity(n * 2);
        let mut y = Vec::with_capacity(n);
        for _ in 0..n {
            let a: f64 = rng.gen_range(-3.0..3.0);
            let b: f64 = rng.gen_range(0.0..100.0);
            let p = logistic(2.0 * a);
            y.push(usize::from(rng.gen::<f64>() < p));
            data.push(a);
            data.push(b);
        }
        DesignMatrix {
            x: Array2::from_shape_vec((n, 2), data).unwrap(),
            y,
            feature_names: vec!["signal".to_string(), "noise".to_string()],
        }
    }

    #[test]
    fn recovers_signal_direction() {
        let design = noisy_design(600, 1);
        let model = LogisticRegression::new().fit(&design).unwrap();
        assert!(model.converged());

        let coefs = model.coefficients();
        assert_eq!(coefs[0].0, "(Intercept)");
        let signal = coefs[1].1;
        let noise = coefs[2].1;
        assert!(signal > 1.0 && signal < 3.5, "signal = {signal}");
        assert!(noise.abs() < 0.05, "noise = {noise}");
    }

    #[test]
    fn accuracy_beats_chance() {
        let design = noisy_design(600, 2);
        let model = LogisticRegression::new().fit(&design).unwrap();
        let predictions = model.predict(&design.x).unwrap();
        let correct = predictions
            .iter()
            .zip(&design.y)
            .filter(|(p, y)| p == y)
            .count();
        assert!(correct as f64 / 600.0 > 0.75);
    }

    #[test]
    fn penalty_shrinks_coefficients() {
        let design = noisy_design(400, 3);
        let plain = LogisticRegression::new().fit(&design).unwrap();
        let ridge = LogisticRegression::new().with_lambda(1.0).fit(&design).unwrap();
        assert!(ridge.coefficients()[1].1.abs() < plain.coefficients()[1].1.abs());
    }

    #[test]
    fn probabilities_are_in_unit_interval() {
        let design = noisy_design(200, 4);
        let model = LogisticRegression::new().fit(&design).unwrap();
        let proba = model.predict_proba(&design.x).unwrap();
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn single_class_is_rejected() {
        let mut design = noisy_design(50, 5);
        design.y = vec![0; 50];
        let err = LogisticRegression::new().fit(&design).unwrap_err();
        assert!(matches!(err, ModelError::SingleClass { n_classes: 1 }));
    }

    #[test]
    fn constant_feature_is_rejected() {
        let mut design = noisy_design(50, 6);
        design.x.column_mut(1).fill(7.0);
        let err = LogisticRegression::new().fit(&design).unwrap_err();
        assert!(matches!(err, ModelError::ConstantFeature { ref feature } if feature == "noise"));
    }

    #[test]
    fn wrong_width_at_prediction() {
        let design = noisy_design(100, 7);
        let model = LogisticRegression::new().fit(&design).unwrap();
        let err = model.predict(&Array2::zeros((2, 3))).unwrap_err();
        assert!(matches!(err, ModelError::FeatureCountMismatch { expected: 2, got: 3 }));
    }
}
