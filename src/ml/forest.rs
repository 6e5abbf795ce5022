//! Bagged decision trees.

use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ClickbaitError, Result};
use crate::ml::tree::DecisionTree;
use crate::ml::{Estimator, Task, check_binary_labels, check_fit_input, not_fitted};

/// How many features each split considers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// ceil(sqrt(n_features))
    Sqrt,
    All,
    Fixed(usize),
}

impl MaxFeatures {
    fn resolve(self, n_features: usize) -> usize {
        match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::All => n_features,
            MaxFeatures::Fixed(n) => n.min(n_features),
        }
        .max(1)
    }
}

/// Random forest classifier or regressor.
///
/// Tree `i` draws its bootstrap sample and its split features from a
/// generator seeded with `random_state + i`, so the fitted forest does not
/// depend on how rayon schedules the trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub random_state: u64,
    task: Task,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    fn with_task(task: Task, max_features: MaxFeatures) -> Self {
        RandomForest {
            n_estimators: 10,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features,
            bootstrap: true,
            random_state: 42,
            task,
            trees: Vec::new(),
        }
    }

    /// Majority-vote forest of Gini trees over sqrt(n_features) candidates.
    pub fn classifier() -> Self {
        RandomForest::with_task(Task::Classification, MaxFeatures::Sqrt)
    }

    /// Averaging forest of variance-reduction trees over all features.
    pub fn regressor() -> Self {
        RandomForest::with_task(Task::Regression, MaxFeatures::All)
    }

    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Per-tree predictions averaged per row: the class-1 vote fraction for
    /// classifiers, the mean prediction for regressors.
    fn average(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(not_fitted("RandomForest"));
        }
        let per_tree = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let mut total: Array1<f64> = Array1::zeros(x.nrows());
        for predictions in &per_tree {
            total += predictions;
        }
        Ok(total / self.trees.len() as f64)
    }
}

impl Estimator for RandomForest {
    fn task(&self) -> Task {
        self.task
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        if self.task == Task::Classification {
            check_binary_labels(y)?;
        }
        if self.n_estimators == 0 {
            return Err(ClickbaitError::configuration(
                "a forest needs at least one tree",
            ));
        }

        let n_samples = x.nrows();
        let max_features = self.max_features.resolve(x.ncols());
        let template = match self.task {
            Task::Classification => DecisionTree::classifier(),
            Task::Regression => DecisionTree::regressor(),
        }
        .with_min_samples_split(self.min_samples_split)
        .with_min_samples_leaf(self.min_samples_leaf)
        .with_max_features(Some(max_features));
        let template = match self.max_depth {
            Some(depth) => template.with_max_depth(depth),
            None => template,
        };

        let trees = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng =
                    ChaCha8Rng::seed_from_u64(self.random_state.wrapping_add(tree_idx as u64));
                let rows: Vec<usize> = if self.bootstrap {
                    (0..n_samples)
                        .map(|_| rng.random_range(0..n_samples))
                        .collect()
                } else {
                    (0..n_samples).collect()
                };
                let mut tree = template.clone().with_random_state(rng.random());
                tree.fit_rows(x, y, &rows)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "fitted {} trees on {} samples, {} of {} features per split",
            trees.len(),
            n_samples,
            max_features,
            x.ncols()
        );
        self.trees = trees;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let averaged = self.average(x)?;
        Ok(match self.task {
            // ties go to 0
            Task::Classification => averaged.mapv(|v| if v > 0.5 { 1.0 } else { 0.0 }),
            Task::Regression => averaged,
        })
    }

    fn scores(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.average(x)
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}
