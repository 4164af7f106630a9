//! Random forest classifier with parallel tree construction.

use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::model::design::DesignMatrix;
use crate::model::error::ModelError;
use crate::model::logistic::validate_training;
use crate::model::tree::{DecisionTree, TreeParams};

/// Random forest configuration.
///
/// | Parameter      | Default                    |
/// |----------------|----------------------------|
/// | `n_trees`      | 100                        |
/// | `max_features` | `floor(sqrt(p))`, min 1    |
/// | `min_samples_split` | 2                     |
/// | `seed`         | 42                         |
#[derive(Debug, Clone)]
pub struct RandomForestConfig {
    n_trees: usize,
    max_features: Option<usize>,
    min_samples_split: usize,
    seed: u64,
}

impl Default for RandomForestConfig {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForestConfig {
    pub fn new(n_trees: usize) -> Self {
        Self {
            n_trees,
            max_features: None,
            min_samples_split: 2,
            seed: 42,
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Candidate features per split. `None` means `floor(sqrt(p))`.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Grow the ensemble on a level-coded design matrix.
    ///
    /// # Errors
    ///
    /// [`ModelError::InvalidParameter`] for zero trees or an out-of-range
    /// `max_features`, plus everything [`validate_training`] rejects.
    #[instrument(skip_all, fields(n_trees = self.n_trees, n_rows = design.n_rows()))]
    pub fn fit(&self, design: &DesignMatrix) -> Result<RandomForest, ModelError> {
        if self.n_trees == 0 {
            return Err(ModelError::InvalidParameter("n_trees must be positive".into()));
        }
        validate_training(design)?;

        let n_samples = design.n_rows();
        let n_features = design.n_features();
        let max_features = self
            .max_features
            .unwrap_or_else(|| ((n_features as f64).sqrt().floor() as usize).max(1));
        if max_features == 0 || max_features > n_features {
            return Err(ModelError::InvalidParameter(format!(
                "max_features = {max_features} outside [1, {n_features}]"
            )));
        }

        let params = TreeParams {
            max_features,
            min_samples_split: self.min_samples_split,
            n_classes: 2,
        };
        let columns: Vec<Vec<f64>> = design
            .x
            .axis_iter(Axis(1))
            .map(|column| column.to_vec())
            .collect();

        info!(n_samples, n_features, max_features, "training random forest");

        let mut master_rng = ChaCha8Rng::seed_from_u64(self.seed);
        let tree_seeds: Vec<u64> = (0..self.n_trees).map(|_| master_rng.gen()).collect();

        // Indexed parallel collect keeps seed order.
        let trees: Vec<DecisionTree> = tree_seeds
            .into_par_iter()
            .map(|seed| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let bootstrap: Vec<usize> =
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
                DecisionTree::grow(&columns, &design.y, &bootstrap, params, &mut rng)
            })
            .collect();

        let mean_nodes =
            trees.iter().map(DecisionTree::n_nodes).sum::<usize>() as f64 / trees.len() as f64;
        debug!(n_trees = trees.len(), mean_nodes, "tree training complete");

        Ok(RandomForest {
            trees,
            feature_names: design.feature_names.clone(),
        })
    }
}

/// A feature with its share of the total impurity decrease.
#[derive(Debug, Clone, Serialize)]
pub struct RankedFeature {
    pub name: String,
    pub importance: f64,
    /// 1 = most important.
    pub rank: usize,
}

/// A fitted ensemble.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    feature_names: Vec<String>,
}

impl RandomForest {
    /// Number of trees voting `Approved` per row.
    fn approve_votes(&self, x: &Array2<f64>) -> Result<Vec<usize>, ModelError> {
        if x.ncols() != self.feature_names.len() {
            return Err(ModelError::FeatureCountMismatch {
                expected: self.feature_names.len(),
                got: x.ncols(),
            });
        }
        let rows: Vec<Vec<f64>> = x.axis_iter(Axis(0)).map(|row| row.to_vec()).collect();
        Ok(rows
            .par_iter()
            .map(|row| self.trees.iter().filter(|t| t.predict_row(row) == 1).count())
            .collect())
    }

    /// Majority vote; a tied vote goes to `Rejected`.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>, ModelError> {
        let n_trees = self.trees.len();
        Ok(self
            .approve_votes(x)?
            .into_iter()
            .map(|votes| usize::from(2 * votes > n_trees))
            .collect())
    }

    /// Fraction of trees voting `Approved`.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let n_trees = self.trees.len() as f64;
        Ok(self
            .approve_votes(x)?
            .into_iter()
            .map(|votes| votes as f64 / n_trees)
            .collect())
    }

    /// Mean decrease in Gini impurity across trees, ranked descending.
    pub fn feature_importances(&self) -> Vec<RankedFeature> {
        let mut totals = vec![0.0f64; self.feature_names.len()];
        for tree in &self.trees {
            for (total, value) in totals.iter_mut().zip(tree.feature_importances()) {
                *total += value;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }

        let mut ranked: Vec<RankedFeature> = self
            .feature_names
            .iter()
            .zip(totals)
            .map(|(name, importance)| RankedFeature {
                name: name.clone(),
                importance,
                rank: 0,
            })
            .collect();
        ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        for (i, feature) in ranked.iter_mut().enumerate() {
            feature.rank = i + 1;
        }
        ranked
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Label is 1 when `a > 0.5`; `b` is noise.
    fn design(n: usize, seed: u64) -> DesignMatrix {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut data = Vec::with_capacity(n * 3);
        let mut y = Vec::with_capacity(n);
        for _ in 0..n {
            let a: f64 = rng.gen();
            let b: f64 = rng.gen();
            let c = f64::from(rng.gen_range(0..4u8));
            y.push(usize::from(a > 0.5));
            data.extend([a, b, c]);
        }
        DesignMatrix {
            x: Array2::from_shape_vec((n, 3), data).unwrap(),
            y,
            feature_names: vec!["a".into(), "b".into(), "c".into()],
        }
    }

    #[test]
    fn learns_threshold_rule() {
        let train = design(400, 1);
        let test = design(200, 2);
        let forest = RandomForestConfig::new(30).fit(&train).unwrap();
        assert_eq!(forest.n_trees(), 30);

        let predictions = forest.predict(&test.x).unwrap();
        let correct = predictions
            .iter()
            .zip(&test.y)
            .filter(|(p, y)| p == y)
            .count();
        assert!(correct as f64 / 200.0 > 0.9);
    }

    #[test]
    fn importances_rank_signal_first() {
        let forest = RandomForestConfig::new(30).fit(&design(400, 3)).unwrap();
        let ranked = forest.feature_importances();
        assert_eq!(ranked[0].name, "a");
        assert_eq!(ranked[0].rank, 1);
        let total: f64 = ranked.iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn same_seed_same_forest() {
        let train = design(200, 4);
        let probe = design(50, 5);
        let first = RandomForestConfig::new(20).with_seed(9).fit(&train).unwrap();
        let second = RandomForestConfig::new(20).with_seed(9).fit(&train).unwrap();
        assert_eq!(
            first.predict_proba(&probe.x).unwrap(),
            second.predict_proba(&probe.x).unwrap()
        );
    }

    #[test]
    fn proba_is_vote_fraction() {
        let forest = RandomForestConfig::new(10).fit(&design(100, 6)).unwrap();
        let probe = design(20, 7);
        for p in forest.predict_proba(&probe.x).unwrap() {
            let scaled = p * 10.0;
            assert!((scaled - scaled.round()).abs() < 1e-9);
        }
    }

    #[test]
    fn even_vote_goes_to_rejected() {
        let forest = RandomForestConfig::new(2).fit(&design(100, 8)).unwrap();
        let probe = design(50, 9);
        let proba = forest.predict_proba(&probe.x).unwrap();
        let labels = forest.predict(&probe.x).unwrap();
        for (p, label) in proba.iter().zip(labels) {
            if (*p - 0.5).abs() < f64::EPSILON {
                assert_eq!(label, 0);
            }
        }
    }

    #[test]
    fn rejects_bad_configuration() {
        let train = design(50, 10);
        assert!(RandomForestConfig::new(0).fit(&train).is_err());
        assert!(RandomForestConfig::new(5)
            .with_max_features(Some(4))
            .fit(&train)
            .is_err());
    }

    #[test]
    fn rejects_wrong_width() {
        let forest = RandomForestConfig::new(5).fit(&design(50, 11)).unwrap();
        let err = forest.predict(&Array2::zeros((1, 2))).unwrap_err();
        assert!(matches!(err, ModelError::FeatureCountMismatch { expected: 3, got: 2 }));
    }
}
