//! Model families, metrics and the trainer that ties them to feature matrices.
//!
//! Every family implements [`Estimator`]. The [`Model`] enum wraps the
//! built-in families so a trained model can be persisted as one value and
//! restored without knowing its concrete type in advance.
//!
//! Trainers hand estimators a CSR [`FeatureMatrix`]. The linear families,
//! naive Bayes, SGD and SVR train on its rows directly; the tree ensembles
//! fall back to a dense copy.

pub mod forest;
pub mod linear;
pub mod metrics;
pub mod naive_bayes;
pub mod registry;
pub mod sgd;
pub mod split;
pub mod svm;
pub mod trainer;
pub mod tree;

use std::fmt;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{ClickbaitError, Result};
use crate::matrix::FeatureMatrix;

pub use forest::{MaxFeatures, RandomForest};
pub use linear::{ElasticNet, Lasso, LogisticRegression, Ridge};
pub use metrics::EvaluationReport;
pub use naive_bayes::MultinomialNB;
pub use registry::ModelRegistry;
pub use sgd::SgdRegressor;
pub use split::train_test_split;
pub use svm::{Kernel, Svr};
pub use trainer::{ClickbaitModel, ModelSelector, TrainedModel};
pub use tree::{Criterion, DecisionTree, TreeNode};

/// What a model predicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Task {
    /// Binary labels in {0, 1}.
    Classification,
    /// Continuous targets.
    Regression,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Classification => write!(f, "classification"),
            Task::Regression => write!(f, "regression"),
        }
    }
}

/// Common interface of every model family.
pub trait Estimator {
    fn task(&self) -> Task;

    /// Fit on a samples x features matrix and one target per sample.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predicted labels (classification) or values (regression).
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Continuous scores used for ranking metrics. Defaults to the predictions.
    fn scores(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.predict(x)
    }

    fn is_fitted(&self) -> bool;

    /// Fit on a CSR matrix. Families without a sparse solver densify it.
    fn fit_matrix(&mut self, x: &FeatureMatrix, y: &Array1<f64>) -> Result<()> {
        self.fit(&x.to_dense(), y)
    }

    fn predict_matrix(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        self.predict(&x.to_dense())
    }

    fn scores_matrix(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        self.scores(&x.to_dense())
    }
}

/// A built-in model family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Model {
    LogisticRegression(LogisticRegression),
    MultinomialNB(MultinomialNB),
    RandomForest(RandomForest),
    Svr(Svr),
    Ridge(Ridge),
    Lasso(Lasso),
    ElasticNet(ElasticNet),
    SgdRegressor(SgdRegressor),
}

impl Model {
    /// Catalog name of the family.
    pub fn family(&self) -> &'static str {
        match self {
            Model::LogisticRegression(_) => "LogisticRegression",
            Model::MultinomialNB(_) => "MultinomialNB",
            Model::RandomForest(m) => match m.task() {
                Task::Classification => "RandomForestClassifier",
                Task::Regression => "RandomForestRegressor",
            },
            Model::Svr(m) => match m.kernel() {
                Kernel::Linear => "SVR_linear",
                Kernel::Rbf { .. } => "SVR",
            },
            Model::Ridge(_) => "Ridge",
            Model::Lasso(_) => "Lasso",
            Model::ElasticNet(_) => "ElasticNet",
            Model::SgdRegressor(_) => "SGDRegressor",
        }
    }

    fn estimator(&self) -> &dyn Estimator {
        match self {
            Model::LogisticRegression(m) => m,
            Model::MultinomialNB(m) => m,
            Model::RandomForest(m) => m,
            Model::Svr(m) => m,
            Model::Ridge(m) => m,
            Model::Lasso(m) => m,
            Model::ElasticNet(m) => m,
            Model::SgdRegressor(m) => m,
        }
    }

    fn estimator_mut(&mut self) -> &mut dyn Estimator {
        match self {
            Model::LogisticRegression(m) => m,
            Model::MultinomialNB(m) => m,
            Model::RandomForest(m) => m,
            Model::Svr(m) => m,
            Model::Ridge(m) => m,
            Model::Lasso(m) => m,
            Model::ElasticNet(m) => m,
            Model::SgdRegressor(m) => m,
        }
    }
}

impl Estimator for Model {
    fn task(&self) -> Task {
        self.estimator().task()
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.estimator_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.estimator().predict(x)
    }

    fn scores(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.estimator().scores(x)
    }

    fn is_fitted(&self) -> bool {
        self.estimator().is_fitted()
    }

    fn fit_matrix(&mut self, x: &FeatureMatrix, y: &Array1<f64>) -> Result<()> {
        self.estimator_mut().fit_matrix(x, y)
    }

    fn predict_matrix(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        self.estimator().predict_matrix(x)
    }

    fn scores_matrix(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        self.estimator().scores_matrix(x)
    }
}

/// Reject empty inputs and row/target count mismatches.
pub(crate) fn check_fit_input(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() == 0 {
        return Err(ClickbaitError::data("cannot fit on an empty feature matrix"));
    }
    if x.nrows() != y.len() {
        return Err(ClickbaitError::data(format!(
            "feature matrix has {} rows but {} targets were given",
            x.nrows(),
            y.len()
        )));
    }
    Ok(())
}

/// [`check_fit_input`] for CSR input.
pub(crate) fn check_matrix_input(x: &FeatureMatrix, y: &Array1<f64>) -> Result<()> {
    if x.nrows() == 0 {
        return Err(ClickbaitError::data("cannot fit on an empty feature matrix"));
    }
    if x.nrows() != y.len() {
        return Err(ClickbaitError::data(format!(
            "feature matrix has {} rows but {} targets were given",
            x.nrows(),
            y.len()
        )));
    }
    Ok(())
}

/// Classification targets must be exactly 0 or 1.
pub(crate) fn check_binary_labels(y: &Array1<f64>) -> Result<()> {
    match y.iter().find(|v| **v != 0.0 && **v != 1.0) {
        Some(label) => Err(ClickbaitError::data(format!(
            "classification labels must be 0 or 1, got {label}"
        ))),
        None => Ok(()),
    }
}

/// Reject prediction input whose width differs from the fit-time width.
pub(crate) fn check_width(expected: usize, x: &Array2<f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(ClickbaitError::data(format!(
            "model was fitted on {expected} features, got {}",
            x.ncols()
        )));
    }
    Ok(())
}

/// [`check_width`] for CSR input.
pub(crate) fn check_matrix_width(expected: usize, x: &FeatureMatrix) -> Result<()> {
    if x.ncols() != expected {
        return Err(ClickbaitError::data(format!(
            "model was fitted on {expected} features, got {}",
            x.ncols()
        )));
    }
    Ok(())
}

pub(crate) fn not_fitted(family: &str) -> ClickbaitError {
    ClickbaitError::no_trained_model(format!("{family} has not been fitted"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_family_names() {
        assert_eq!(
            Model::RandomForest(RandomForest::classifier()).family(),
            "RandomForestClassifier"
        );
        assert_eq!(
            Model::RandomForest(RandomForest::regressor()).family(),
            "RandomForestRegressor"
        );
        assert_eq!(Model::Svr(Svr::linear()).family(), "SVR_linear");
        assert_eq!(Model::Svr(Svr::rbf()).family(), "SVR");
        assert_eq!(Model::Ridge(Ridge::default()).family(), "Ridge");
    }

    #[test]
    fn test_model_dispatch() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![2.0, 4.0, 6.0, 8.0];

        let mut model = Model::Ridge(Ridge::new(0.0));
        assert!(!model.is_fitted());
        assert_eq!(model.task(), Task::Regression);
        model.fit(&x, &y).unwrap();
        assert!(model.is_fitted());

        let predicted = model.predict(&array![[5.0]]).unwrap();
        assert!((predicted[0] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_input_checks() {
        let x = array![[1.0], [2.0]];
        assert!(check_fit_input(&x, &array![1.0]).is_err());
        assert!(check_fit_input(&Array2::zeros((0, 1)), &array![]).is_err());
        assert!(check_binary_labels(&array![0.0, 1.0, 1.0]).is_ok());
        assert!(check_binary_labels(&array![0.0, 0.5]).is_err());
        assert!(check_width(2, &x).is_err());

        let sparse = FeatureMatrix::from_dense(&x);
        assert!(check_matrix_input(&sparse, &array![1.0]).is_err());
        assert!(check_matrix_input(&FeatureMatrix::new(1), &array![]).is_err());
        assert!(check_matrix_width(2, &sparse).is_err());
        assert!(check_matrix_width(1, &sparse).is_ok());
    }

    #[test]
    fn test_model_forwards_matrix_input() {
        let dense = array![[1.0, 0.0], [0.0, 2.0], [3.0, 1.0], [2.0, 2.0]];
        let x = FeatureMatrix::from_dense(&dense);
        let y = array![1.0, 4.0, 4.0, 6.0];

        let mut model = Model::Lasso(Lasso::new(0.01));
        model.fit_matrix(&x, &y).unwrap();
        assert_eq!(model.predict_matrix(&x).unwrap(), model.predict(&dense).unwrap());
        assert_eq!(model.scores_matrix(&x).unwrap(), model.scores(&dense).unwrap());
    }
}
