//! Stratified train/test partitioning of row indices.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Error, Debug, PartialEq)]
pub enum SplitError {
    #[error("train fraction must be in (0, 1), got {fraction}")]
    InvalidFraction { fraction: f64 },
}

/// Which side of a [`Partition`] to view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subset {
    Train,
    Test,
}

/// Two disjoint, sorted row-index sets covering the input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Partition {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl Partition {
    pub fn rows(&self, subset: Subset) -> &[usize] {
        match subset {
            Subset::Train => &self.train,
            Subset::Test => &self.test,
        }
    }

    pub fn len(&self) -> usize {
        self.train.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Per-class counts for one side, indexed by class.
    pub fn class_counts(&self, subset: Subset, labels: &[usize], n_classes: usize) -> Vec<usize> {
        let mut counts = vec![0usize; n_classes];
        for &row in self.rows(subset) {
            counts[labels[row]] += 1;
        }
        counts
    }
}

/// Stratified splitter: each label group contributes `fraction` of its rows to training.
#[derive(Debug, Clone)]
pub struct StratifiedSplitter {
    fraction: f64,
    seed: u64,
}

impl StratifiedSplitter {
    pub fn new(fraction: f64) -> Result<Self, SplitError> {
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(SplitError::InvalidFraction { fraction });
        }
        Ok(Self { fraction, seed: 42 })
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Partition row indices `0..labels.len()` by class label.
    #[instrument(skip_all, fields(n_rows = labels.len(), fraction = self.fraction, seed = self.seed))]
    pub fn split(&self, labels: &[usize]) -> Partition {
        let n_classes = labels.iter().max().map_or(0, |&m| m + 1);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        // Group indices by class.
        let mut class_indices: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
        for (row, &label) in labels.iter().enumerate() {
            class_indices[label].push(row);
        }

        let mut train_groups: Vec<Vec<usize>> = Vec::with_capacity(n_classes);
        let mut test = Vec::new();

        for indices in &mut class_indices {
            indices.shuffle(&mut rng);
            let n = indices.len();
            let n_train = if n < 2 {
                n
            } else {
                ((self.fraction * n as f64).round() as usize).clamp(1, n - 1)
            };
            train_groups.push(indices[..n_train].to_vec());
            test.extend_from_slice(&indices[n_train..]);
        }

        // Only possible when every group is a singleton.
        if test.is_empty() && labels.len() >= 2 {
            if let Some(moved) = train_groups
                .iter_mut()
                .max_by_key(|g| g.len())
                .and_then(|largest| largest.pop())
            {
                test.push(moved);
            }
        }

        let mut train: Vec<usize> = train_groups.into_iter().flatten().collect();
        train.sort_unstable();
        test.sort_unstable();

        debug!(n_train = train.len(), n_test = test.len(), "stratified split");
        Partition { train, test }
    }
}
