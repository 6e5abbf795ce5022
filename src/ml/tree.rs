//! CART decision tree, the building block of the random forests.

use ndarray::{Array1, Array2, ArrayView1};
use rand::SeedableRng;
use rand::seq::index;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ClickbaitError, Result};
use crate::ml::{
    Estimator, Task, check_binary_labels, check_fit_input, check_width, not_fitted,
};

/// Decision tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

impl TreeNode {
    fn predict(&self, sample: ArrayView1<f64>) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if sample[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

/// Impurity criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criterion {
    /// Gini impurity over the 0/1 labels
    Gini,
    /// Variance of the targets
    Mse,
}

/// Running sums for one side of a candidate split.
#[derive(Debug, Clone, Copy, Default)]
struct SideStats {
    count: usize,
    sum: f64,
    sq_sum: f64,
}

impl SideStats {
    fn add(&mut self, y: f64) {
        self.count += 1;
        self.sum += y;
        self.sq_sum += y * y;
    }

    fn remove(&mut self, y: f64) {
        self.count -= 1;
        self.sum -= y;
        self.sq_sum -= y * y;
    }

    fn impurity(&self, criterion: Criterion) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        match criterion {
            // labels are 0/1, so `sum` is the positive count
            Criterion::Gini => {
                let p = self.sum / n;
                1.0 - p * p - (1.0 - p) * (1.0 - p)
            }
            Criterion::Mse => (self.sq_sum / n - (self.sum / n).powi(2)).max(0.0),
        }
    }
}

/// A binary decision tree for 0/1 classification or regression.
///
/// Splits are axis-aligned at the midpoint between two consecutive distinct
/// feature values. With `max_features` set, each node examines a random
/// subset of the features drawn from the tree's seeded generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: Option<usize>,
    pub criterion: Criterion,
    pub random_state: u64,
    task: Task,
    root: Option<TreeNode>,
    n_features: usize,
}

impl Default for DecisionTree {
    fn default() -> Self {
        DecisionTree::classifier()
    }
}

impl DecisionTree {
    fn with_task(task: Task, criterion: Criterion) -> Self {
        DecisionTree {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion,
            random_state: 42,
            task,
            root: None,
            n_features: 0,
        }
    }

    /// Gini classification tree.
    pub fn classifier() -> Self {
        DecisionTree::with_task(Task::Classification, Criterion::Gini)
    }

    /// Variance-reduction regression tree.
    pub fn regressor() -> Self {
        DecisionTree::with_task(Task::Regression, Criterion::Mse)
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    pub fn depth(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::depth)
    }

    pub fn n_leaves(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::n_leaves)
    }

    /// Fit on the rows of `x` listed in `indices`; repeated indices count
    /// once per occurrence, which is how bootstrap samples are passed in.
    pub fn fit_rows(&mut self, x: &Array2<f64>, y: &Array1<f64>, indices: &[usize]) -> Result<()> {
        check_fit_input(x, y)?;
        if self.task == Task::Classification {
            check_binary_labels(y)?;
        }
        if indices.is_empty() {
            return Err(ClickbaitError::data("cannot fit a tree on zero rows"));
        }
        if self.min_samples_leaf == 0 {
            return Err(ClickbaitError::configuration(
                "min_samples_leaf must be at least 1",
            ));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let builder = Builder {
            tree: self,
            x,
            y,
            n_candidates: self
                .max_features
                .map_or(x.ncols(), |m| m.clamp(1, x.ncols().max(1))),
        };
        let root = builder.build(indices.to_vec(), 0, &mut rng);

        self.n_features = x.ncols();
        self.root = Some(root);
        Ok(())
    }

    fn leaf_value(&self, y: &Array1<f64>, indices: &[usize]) -> f64 {
        let n = indices.len() as f64;
        let sum: f64 = indices.iter().map(|&i| y[i]).sum();
        match self.task {
            // majority label; ties go to 0
            Task::Classification => {
                if sum > n / 2.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Task::Regression => sum / n,
        }
    }
}

struct Builder<'a> {
    tree: &'a DecisionTree,
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    n_candidates: usize,
}

impl Builder<'_> {
    fn build(&self, indices: Vec<usize>, depth: usize, rng: &mut ChaCha8Rng) -> TreeNode {
        let n_samples = indices.len();
        let leaf = || TreeNode::Leaf {
            value: self.tree.leaf_value(self.y, &indices),
            n_samples,
        };

        let first = self.y[indices[0]];
        let pure = indices.iter().all(|&i| self.y[i] == first);
        if pure
            || n_samples < self.tree.min_samples_split
            || n_samples < 2 * self.tree.min_samples_leaf
            || self.tree.max_depth.is_some_and(|d| depth >= d)
        {
            return leaf();
        }

        let Some((feature, threshold)) = self.best_split(&indices, rng) else {
            return leaf();
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.x[[i, feature]] <= threshold);
        if left.is_empty() || right.is_empty() {
            return leaf();
        }

        TreeNode::Split {
            feature,
            threshold,
            left: Box::new(self.build(left, depth + 1, rng)),
            right: Box::new(self.build(right, depth + 1, rng)),
            n_samples,
        }
    }

    fn candidate_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        let n_features = self.x.ncols();
        if self.n_candidates >= n_features {
            return (0..n_features).collect();
        }
        let mut features = index::sample(rng, n_features, self.n_candidates).into_vec();
        features.sort_unstable();
        features
    }

    fn best_split(&self, indices: &[usize], rng: &mut ChaCha8Rng) -> Option<(usize, f64)> {
        let criterion = self.tree.criterion;
        let min_leaf = self.tree.min_samples_leaf;
        let n = indices.len() as f64;

        let mut all = SideStats::default();
        for &i in indices {
            all.add(self.y[i]);
        }
        let parent = all.impurity(criterion);

        let mut best: Option<(usize, f64)> = None;
        let mut best_gain = 1e-12;
        let mut order = indices.to_vec();

        for feature in self.candidate_features(rng) {
            order.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));

            let mut left = SideStats::default();
            let mut right = all;
            for pos in 0..order.len() - 1 {
                let yi = self.y[order[pos]];
                left.add(yi);
                right.remove(yi);

                let value = self.x[[order[pos], feature]];
                let next = self.x[[order[pos + 1], feature]];
                if value == next || left.count < min_leaf || right.count < min_leaf {
                    continue;
                }

                let weighted = (left.count as f64 * left.impurity(criterion)
                    + right.count as f64 * right.impurity(criterion))
                    / n;
                let gain = parent - weighted;
                if gain > best_gain {
                    best_gain = gain;
                    best = Some((feature, value + (next - value) / 2.0));
                }
            }
        }

        best
    }
}

impl Estimator for DecisionTree {
    fn task(&self) -> Task {
        self.task
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.fit_rows(x, y, &indices)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or_else(|| not_fitted("DecisionTree"))?;
        check_width(self.n_features, x)?;
        Ok(x.rows().into_iter().map(|row| root.predict(row)).collect())
    }

    fn is_fitted(&self) -> bool {
        self.root.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier_separates_threshold() {
        let x = array![[1.0, 5.0], [2.0, 3.0], [3.0, 4.0], [7.0, 3.0], [8.0, 5.0], [9.0, 4.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut tree = DecisionTree::classifier();
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.predict(&x).unwrap(), y);
        assert_eq!(tree.depth(), 1);
        match tree.root().unwrap() {
            TreeNode::Split {
                feature, threshold, ..
            } => {
                assert_eq!(*feature, 0);
                assert_eq!(*threshold, 5.0);
            }
            leaf => panic!("expected a split, got {leaf:?}"),
        }
    }

    #[test]
    fn test_regressor_fits_steps() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![1.0, 1.0, 1.0, 5.0, 5.0, 9.0];

        let mut tree = DecisionTree::regressor();
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.predict(&x).unwrap(), y);
        assert_eq!(tree.n_leaves(), 3);
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![0.0, 1.0, 0.0, 1.0];

        let mut stump = DecisionTree::classifier().with_max_depth(1);
        stump.fit(&x, &y).unwrap();
        assert!(stump.depth() <= 1);

        let mut full = DecisionTree::classifier();
        full.fit(&x, &y).unwrap();
        assert_eq!(full.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_constant_features_give_a_leaf() {
        let x = array![[1.0], [1.0], [1.0]];
        let y = array![0.0, 1.0, 1.0];
        let mut tree = DecisionTree::classifier();
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.predict(&x).unwrap(), array![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_seeded_feature_sampling_is_deterministic() {
        let x = array![
            [0.1, 3.0, 1.0, 0.0],
            [0.4, 1.0, 0.0, 1.0],
            [0.2, 2.0, 1.0, 1.0],
            [0.9, 0.0, 0.0, 0.0],
            [0.7, 4.0, 1.0, 1.0],
            [0.5, 5.0, 0.0, 0.0]
        ];
        let y = array![0.0, 1.0, 0.0, 1.0, 1.0, 0.0];

        let mut a = DecisionTree::classifier().with_max_features(Some(2)).with_random_state(7);
        let mut b = a.clone();
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.root(), b.root());
    }

    #[test]
    fn test_fit_rows_uses_repeated_indices() {
        let x = array![[0.0], [1.0]];
        let y = array![0.0, 1.0];
        let mut tree = DecisionTree::classifier();
        tree.fit_rows(&x, &y, &[1, 1, 1]).unwrap();
        assert_eq!(tree.predict(&x).unwrap(), array![1.0, 1.0]);
    }

    #[test]
    fn test_classifier_rejects_non_binary_labels() {
        let mut tree = DecisionTree::classifier();
        assert!(tree.fit(&array![[1.0], [2.0]], &array![0.0, 3.0]).is_err());
        let mut tree = DecisionTree::regressor();
        assert!(tree.fit(&array![[1.0], [2.0]], &array![0.0, 3.0]).is_ok());
    }
}
