//! CART classification tree with Gini impurity, stored as a node arena.

use rand::Rng;

/// Gini impurity `1 - Σ p_i²` of a node's class counts. Zero for an empty node.
pub fn gini(class_counts: &[usize], n_samples: usize) -> f64 {
    if n_samples == 0 {
        return 0.0;
    }
    let n = n_samples as f64;
    1.0 - class_counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Leaf {
        prediction: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        /// `n * gini(parent) - n_l * gini(left) - n_r * gini(right)`
        impurity_decrease: f64,
    },
}

#[derive(Debug)]
struct SplitResult {
    feature: usize,
    threshold: f64,
    impurity_decrease: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

/// Tree growth parameters.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub max_features: usize,
    pub min_samples_split: usize,
    pub n_classes: usize,
}

/// A fitted decision tree. Index 0 is the root.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    n_features: usize,
}

impl DecisionTree {
    /// Grow a tree on `sample_indices` (duplicates allowed, as in a bootstrap sample).
    ///
    /// `columns[feature][row]` is column-major.
    pub(crate) fn grow(
        columns: &[Vec<f64>],
        labels: &[usize],
        sample_indices: &[usize],
        params: TreeParams,
        rng: &mut impl Rng,
    ) -> Self {
        let mut nodes = Vec::new();
        build(columns, labels, sample_indices, params, rng, &mut nodes);
        Self {
            nodes,
            n_features: columns.len(),
        }
    }

    /// Class for one row: go left when `row[feature] <= threshold`.
    pub fn predict_row(&self, row: &[f64]) -> usize {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { prediction } => return *prediction,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Impurity decrease per feature, normalized to sum to 1 (all zeros for a stump).
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_features];
        for node in &self.nodes {
            if let Node::Split {
                feature,
                impurity_decrease,
                ..
            } = node
            {
                totals[*feature] += impurity_decrease;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }
}

fn build(
    columns: &[Vec<f64>],
    labels: &[usize],
    sample_indices: &[usize],
    params: TreeParams,
    rng: &mut impl Rng,
    arena: &mut Vec<Node>,
) -> usize {
    let n_samples = sample_indices.len();
    let mut class_counts = vec![0usize; params.n_classes];
    for &si in sample_indices {
        class_counts[labels[si]] += 1;
    }

    // First maximum wins, so ties go to the lower class index.
    let majority = class_counts
        .iter()
        .enumerate()
        .fold((0, 0), |best, (class, &count)| {
            if count > best.1 {
                (class, count)
            } else {
                best
            }
        })
        .0;

    let pure = class_counts.iter().filter(|&&c| c > 0).count() <= 1;
    if pure || n_samples < params.min_samples_split {
        arena.push(Node::Leaf {
            prediction: majority,
        });
        return arena.len() - 1;
    }

    let Some(split) = find_best_split(columns, labels, sample_indices, &class_counts, params, rng)
    else {
        arena.push(Node::Leaf {
            prediction: majority,
        });
        return arena.len() - 1;
    };

    // Reserve the slot, build children, then overwrite.
    let node_idx = arena.len();
    arena.push(Node::Leaf {
        prediction: majority,
    });
    let left = build(columns, labels, &split.left, params, rng, arena);
    let right = build(columns, labels, &split.right, params, rng, arena);
    arena[node_idx] = Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left,
        right,
        impurity_decrease: split.impurity_decrease,
    };
    node_idx
}

/// Best Gini split over `max_features` randomly drawn features.
///
/// Returns `None` when every drawn feature is constant on the node.
fn find_best_split(
    columns: &[Vec<f64>],
    labels: &[usize],
    sample_indices: &[usize],
    parent_counts: &[usize],
    params: TreeParams,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_features = columns.len();
    let n_samples = sample_indices.len();
    let parent_impurity = gini(parent_counts, n_samples);

    // Partial Fisher-Yates over the feature indices.
    let mut feature_order: Vec<usize> = (0..n_features).collect();
    let take = params.max_features.min(n_features);
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        feature_order.swap(i, j);
    }

    let mut best_decrease = f64::NEG_INFINITY;
    let mut best: Option<(usize, f64)> = None;

    for &feature in &feature_order[..take] {
        let column = &columns[feature];
        let mut sorted: Vec<(f64, usize)> = sample_indices
            .iter()
            .map(|&si| (column[si], labels[si]))
            .collect();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_counts = vec![0usize; params.n_classes];
        let mut right_counts = parent_counts.to_vec();

        for i in 0..n_samples - 1 {
            let (value, class) = sorted[i];
            left_counts[class] += 1;
            right_counts[class] -= 1;

            let next = sorted[i + 1].0;
            if value == next {
                continue;
            }

            let n_left = i + 1;
            let n_right = n_samples - n_left;
            let decrease = n_samples as f64 * parent_impurity
                - n_left as f64 * gini(&left_counts, n_left)
                - n_right as f64 * gini(&right_counts, n_right);

            if decrease > best_decrease {
                best_decrease = decrease;
                best = Some((feature, (value + next) / 2.0));
            }
        }
    }

    let (feature, threshold) = best?;
    let (left, right): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .partition(|&&si| columns[feature][si] <= threshold);

    Some(SplitResult {
        feature,
        threshold,
        impurity_decrease: best_decrease,
        left,
        right,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn params(max_features: usize) -> TreeParams {
        TreeParams {
            max_features,
            min_samples_split: 2,
            n_classes: 2,
        }
    }

    #[test]
    fn gini_values() {
        assert!((gini(&[10, 0], 10) - 0.0).abs() < f64::EPSILON);
        assert!((gini(&[5, 5], 10) - 0.5).abs() < f64::EPSILON);
        assert!((gini(&[], 0) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn separates_on_informative_feature() {
        // Feature 0 is constant, feature 1 separates the classes at 5.
        let columns = vec![vec![1.0; 10], (0..10).map(f64::from).collect()];
        let labels: Vec<usize> = (0..10).map(|i| usize::from(i >= 5)).collect();
        let rows: Vec<usize> = (0..10).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let tree = DecisionTree::grow(&columns, &labels, &rows, params(2), &mut rng);
        assert_eq!(tree.n_nodes(), 3);
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.predict_row(&[1.0, 2.0]), 0);
        assert_eq!(tree.predict_row(&[1.0, 8.0]), 1);
        assert_eq!(tree.feature_importances(), vec![0.0, 1.0]);
    }

    #[test]
    fn constant_features_give_a_majority_leaf() {
        let columns = vec![vec![3.0; 5]];
        let labels = vec![0, 1, 1, 0, 1];
        let rows: Vec<usize> = (0..5).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let tree = DecisionTree::grow(&columns, &labels, &rows, params(1), &mut rng);
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict_row(&[3.0]), 1);
        assert_eq!(tree.feature_importances(), vec![0.0]);
    }

    #[test]
    fn leaf_ties_go_to_lower_class() {
        let columns = vec![vec![0.0; 4]];
        let labels = vec![1, 0, 1, 0];
        let rows: Vec<usize> = (0..4).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let tree = DecisionTree::grow(&columns, &labels, &rows, params(1), &mut rng);
        assert_eq!(tree.predict_row(&[0.0]), 0);
    }

    #[test]
    fn fits_training_data_exactly_when_separable() {
        let columns = vec![vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0]];
        let labels = vec![0, 1, 0, 1, 1, 1];
        let rows: Vec<usize> = (0..6).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let tree = DecisionTree::grow(&columns, &labels, &rows, params(2), &mut rng);
        for r in 0..6 {
            let row = [columns[0][r], columns[1][r]];
            assert_eq!(tree.predict_row(&row), labels[r]);
        }
    }
}
