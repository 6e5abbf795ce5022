//! Multinomial naive Bayes for non-negative count-like features.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{ClickbaitError, Result};
use crate::matrix::FeatureMatrix;
use crate::ml::{
    Estimator, Task, check_binary_labels, check_fit_input, check_matrix_input,
    check_matrix_width, not_fitted,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ClassModel {
    label: f64,
    log_prior: f64,
    feature_log_prob: Array1<f64>,
}

/// Multinomial naive Bayes with additive (Laplace) smoothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultinomialNB {
    /// Additive smoothing applied to every feature count
    pub alpha: f64,
    classes: Vec<ClassModel>,
    n_features: usize,
}

impl Default for MultinomialNB {
    fn default() -> Self {
        MultinomialNB::new(1.0)
    }
}

impl MultinomialNB {
    pub fn new(alpha: f64) -> Self {
        MultinomialNB {
            alpha,
            classes: Vec::new(),
            n_features: 0,
        }
    }

    /// Labels seen during fit, ascending.
    pub fn classes(&self) -> Vec<f64> {
        self.classes.iter().map(|c| c.label).collect()
    }

    /// Unnormalised joint log likelihood, one column per class.
    fn joint_log_likelihood(&self, x: &FeatureMatrix) -> Result<Array2<f64>> {
        if self.classes.is_empty() {
            return Err(not_fitted("MultinomialNB"));
        }
        check_matrix_width(self.n_features, x)?;

        let mut jll = Array2::zeros((x.nrows(), self.classes.len()));
        for (k, class) in self.classes.iter().enumerate() {
            let column = x.dot(&class.feature_log_prob) + class.log_prior;
            jll.column_mut(k).assign(&column);
        }
        Ok(jll)
    }

    /// Posterior probability of class 1 for every row.
    pub fn predict_proba(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        let jll = self.joint_log_likelihood(x)?;
        let positive = self.classes.iter().position(|c| c.label == 1.0);

        Ok(jll
            .rows()
            .into_iter()
            .map(|row| {
                let Some(k) = positive else {
                    return 0.0;
                };
                let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let total: f64 = row.iter().map(|v| (v - max).exp()).sum();
                (row[k] - max).exp() / total
            })
            .collect())
    }
}

impl Estimator for MultinomialNB {
    fn task(&self) -> Task {
        Task::Classification
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        self.fit_matrix(&FeatureMatrix::from_dense(x), y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.predict_matrix(&FeatureMatrix::from_dense(x))
    }

    fn scores(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.predict_proba(&FeatureMatrix::from_dense(x))
    }

    fn is_fitted(&self) -> bool {
        !self.classes.is_empty()
    }

    fn fit_matrix(&mut self, x: &FeatureMatrix, y: &Array1<f64>) -> Result<()> {
        check_matrix_input(x, y)?;
        check_binary_labels(y)?;
        if !self.alpha.is_finite() || self.alpha <= 0.0 {
            return Err(ClickbaitError::configuration(format!(
                "smoothing alpha must be positive, got {}",
                self.alpha
            )));
        }
        if let Some(value) = x.values().iter().find(|v| **v < 0.0) {
            return Err(ClickbaitError::data(format!(
                "MultinomialNB needs non-negative features, got {value}"
            )));
        }

        let n_samples = x.nrows() as f64;
        let n_features = x.ncols();
        let mut classes = Vec::new();

        for label in [0.0, 1.0] {
            let rows: Vec<usize> = y
                .iter()
                .enumerate()
                .filter(|(_, v)| **v == label)
                .map(|(i, _)| i)
                .collect();
            if rows.is_empty() {
                continue;
            }

            let mut counts = Array1::from_elem(n_features, self.alpha);
            for &i in &rows {
                x.add_row_to(i, 1.0, &mut counts);
            }
            let total = counts.sum();

            classes.push(ClassModel {
                label,
                log_prior: (rows.len() as f64 / n_samples).ln(),
                feature_log_prob: counts.mapv(|c| (c / total).ln()),
            });
        }

        self.classes = classes;
        self.n_features = n_features;
        Ok(())
    }

    fn predict_matrix(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        let jll = self.joint_log_likelihood(x)?;
        Ok(jll
            .rows()
            .into_iter()
            .map(|row| {
                // first maximum wins, so ties go to the smaller label
                let mut best = 0;
                for (k, value) in row.iter().enumerate() {
                    if *value > row[best] {
                        best = k;
                    }
                }
                self.classes[best].label
            })
            .collect())
    }

    fn scores_matrix(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        self.predict_proba(x)
    }
}
