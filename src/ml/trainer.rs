//! Fits catalog models on feature matrices and owns the trained model.
//!
//! Feature matrices stay in CSR form on the way into every model; only the
//! tree ensembles densify them.

use std::path::Path;

use ndarray::{Array1, Axis};
use serde::{Deserialize, Serialize};

use crate::config::TrainerConfig;
use crate::error::{ClickbaitError, Result};
use crate::matrix::FeatureMatrix;
use crate::ml::metrics::{self, EvaluationReport};
use crate::ml::{Estimator, Model, ModelRegistry, Task, check_binary_labels, train_test_split};
use crate::persist::{self, MODEL_MAGIC};

/// Which model a training call fits.
#[derive(Debug, Clone)]
pub enum ModelSelector {
    /// A catalog name, resolved through the trainer's [`ModelRegistry`].
    Name(String),
    /// A configured instance, fitted as given.
    Instance(Model),
}

impl From<&str> for ModelSelector {
    fn from(name: &str) -> Self {
        ModelSelector::Name(name.to_string())
    }
}

impl From<String> for ModelSelector {
    fn from(name: String) -> Self {
        ModelSelector::Name(name)
    }
}

impl From<Model> for ModelSelector {
    fn from(model: Model) -> Self {
        ModelSelector::Instance(model)
    }
}

/// A fitted model with the input width it was fitted on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    family: String,
    task: Task,
    n_features: usize,
    model: Model,
}

impl TrainedModel {
    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn task(&self) -> Task {
        self.task
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    fn check_input(&self, features: &FeatureMatrix) -> Result<()> {
        if features.ncols() != self.n_features {
            return Err(ClickbaitError::data(format!(
                "{} was trained on {} features, got {}",
                self.family,
                self.n_features,
                features.ncols()
            )));
        }
        Ok(())
    }
}

/// Trains classifiers and regressors and holds the single active model.
///
/// A successful `classify`, `regress` or `load` replaces the active model; a
/// failed one leaves it untouched.
#[derive(Debug, Clone, Default)]
pub struct ClickbaitModel {
    registry: ModelRegistry,
    config: TrainerConfig,
    trained: Option<TrainedModel>,
}

impl ClickbaitModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: TrainerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_registry(mut self, registry: ModelRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ModelRegistry {
        &mut self.registry
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// The active model, if any.
    pub fn trained(&self) -> Option<&TrainedModel> {
        self.trained.as_ref()
    }

    /// Fit a classifier on 0/1 labels.
    ///
    /// With `evaluate` the model is fitted on the training split only and the
    /// classification metrics of the held-out split are returned.
    pub fn classify<S: Into<ModelSelector>>(
        &mut self,
        features: &FeatureMatrix,
        labels: &Array1<f64>,
        selector: S,
        evaluate: bool,
    ) -> Result<Option<EvaluationReport>> {
        self.train(Task::Classification, features, labels, selector.into(), evaluate)
    }

    /// Fit a regressor on continuous targets. See [`ClickbaitModel::classify`].
    pub fn regress<S: Into<ModelSelector>>(
        &mut self,
        features: &FeatureMatrix,
        labels: &Array1<f64>,
        selector: S,
        evaluate: bool,
    ) -> Result<Option<EvaluationReport>> {
        self.train(Task::Regression, features, labels, selector.into(), evaluate)
    }

    fn train(
        &mut self,
        task: Task,
        features: &FeatureMatrix,
        labels: &Array1<f64>,
        selector: ModelSelector,
        evaluate: bool,
    ) -> Result<Option<EvaluationReport>> {
        let mut model = match selector {
            ModelSelector::Name(name) => self.registry.create(&name)?,
            ModelSelector::Instance(model) => model,
        };
        let family = model.family().to_string();
        if model.task() != task {
            return Err(ClickbaitError::configuration(format!(
                "{family} is a {} model and cannot be used for {task}",
                model.task()
            )));
        }
        if features.nrows() != labels.len() {
            return Err(ClickbaitError::data(format!(
                "feature matrix has {} rows but {} labels were given",
                features.nrows(),
                labels.len()
            )));
        }
        if task == Task::Classification {
            check_binary_labels(labels)?;
        }

        let (n_samples, n_features) = features.shape();
        let report = if evaluate {
            let (train, test) =
                train_test_split(n_samples, self.config.test_size, self.config.random_state)?;
            let x_train = features.select_rows(&train)?;
            let y_train = labels.select(Axis(0), &train);
            let x_test = features.select_rows(&test)?;
            let y_test = labels.select(Axis(0), &test);

            model.fit_matrix(&x_train, &y_train)?;
            let values = model.predict_matrix(&x_test)?;
            let scores = model.scores_matrix(&x_test)?;
            let metrics = metrics::evaluate(
                task,
                &y_test.to_vec(),
                &values.to_vec(),
                &scores.to_vec(),
            );

            log::info!(
                "evaluated {family} on {} held-out of {} samples",
                test.len(),
                n_samples
            );
            for (name, value) in &metrics {
                if value.is_nan() {
                    log::warn!("{name} is undefined on this split");
                }
                log::info!("{name}: {value:.4}");
            }
            Some(EvaluationReport {
                task,
                family: family.clone(),
                n_train: train.len(),
                n_test: test.len(),
                metrics,
            })
        } else {
            model.fit_matrix(features, labels)?;
            log::info!(
                "fitted {family} on {n_samples} samples x {n_features} features ({} stored cells)",
                features.nnz()
            );
            None
        };

        self.trained = Some(TrainedModel {
            family,
            task,
            n_features,
            model,
        });
        Ok(report)
    }

    /// Predicted labels or values for every row.
    pub fn predict(&self, features: &FeatureMatrix) -> Result<Array1<f64>> {
        let trained = self.active()?;
        trained.check_input(features)?;
        trained.model.predict_matrix(features)
    }

    /// Continuous scores for every row: class-1 probabilities or vote
    /// fractions for classifiers, the predictions for regressors.
    pub fn scores(&self, features: &FeatureMatrix) -> Result<Array1<f64>> {
        let trained = self.active()?;
        trained.check_input(features)?;
        trained.model.scores_matrix(features)
    }

    fn active(&self) -> Result<&TrainedModel> {
        self.trained
            .as_ref()
            .ok_or_else(|| ClickbaitError::no_trained_model("train or load a model first"))
    }

    /// Persist the active model.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let trained = self.active()?;
        persist::write_artifact(path.as_ref(), MODEL_MAGIC, trained)?;
        log::info!(
            "saved {} model to {}",
            trained.family,
            path.as_ref().display()
        );
        Ok(())
    }

    /// Replace the active model with one read from `path`.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let trained: TrainedModel = persist::read_artifact(path.as_ref(), MODEL_MAGIC)?;
        if !trained.model.is_fitted() {
            return Err(ClickbaitError::corrupt_state(format!(
                "persisted {} model is not fitted",
                trained.family
            )));
        }
        if trained.model.family() != trained.family || trained.model.task() != trained.task {
            return Err(ClickbaitError::corrupt_state(format!(
                "persisted model claims to be a {} {} but holds a {} {}",
                trained.task,
                trained.family,
                trained.model.task(),
                trained.model.family()
            )));
        }
        log::info!(
            "loaded {} model ({} features) from {}",
            trained.family,
            trained.n_features,
            path.as_ref().display()
        );
        self.trained = Some(trained);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::Ridge;
    use ndarray::{Array2, array};
    use tempfile::TempDir;

    fn regression_data() -> (FeatureMatrix, Array1<f64>) {
        let x = Array2::from_shape_fn((12, 2), |(i, j)| (i * (j + 1)) as f64 / 4.0);
        let y = x.column(0).mapv(|v| 3.0 * v + 1.0) - &x.column(1).mapv(|v| 0.5 * v);
        (FeatureMatrix::from_dense(&x), y)
    }

    fn classification_data() -> (FeatureMatrix, Array1<f64>) {
        let x = Array2::from_shape_fn((12, 2), |(i, j)| {
            let side = if i % 2 == 0 { -1.0 } else { 1.0 };
            side * (1.0 + (i + j) as f64 / 10.0)
        });
        let y = Array1::from_shape_fn(12, |i| (i % 2) as f64);
        (FeatureMatrix::from_dense(&x), y)
    }

    #[test]
    fn test_regress_and_predict() {
        let (x, y) = regression_data();
        let mut trainer = ClickbaitModel::new();
        let report = trainer.regress(&x, &y, "Ridge", false).unwrap();
        assert!(report.is_none());

        let trained = trainer.trained().unwrap();
        assert_eq!(trained.family(), "Ridge");
        assert_eq!(trained.n_features(), 2);
        assert_eq!(trainer.predict(&x).unwrap().len(), 12);
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let (x, y) = classification_data();
        let mut trainer = ClickbaitModel::new();
        let first = trainer
            .classify(&x, &y, "LogisticRegression", true)
            .unwrap()
            .unwrap();
        let second = trainer
            .classify(&x, &y, "LogisticRegression", true)
            .unwrap()
            .unwrap();

        assert_eq!(first.n_test, 3);
        assert_eq!(first.n_train, 9);
        assert_eq!(first.metrics.len(), 5);
        for ((name_a, a), (name_b, b)) in first.metrics.iter().zip(&second.metrics) {
            assert_eq!(name_a, name_b);
            assert!(a == b || (a.is_nan() && b.is_nan()));
        }
    }

    #[test]
    fn test_regression_report() {
        let (x, y) = regression_data();
        let mut trainer = ClickbaitModel::new();
        let report = trainer.regress(&x, &y, "Ridge", true).unwrap().unwrap();
        let names: Vec<&str> = report.metrics.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            [
                "Explained variance",
                "Mean absolute error",
                "Mean squared error",
                "Median absolute error",
                "R2 score",
                "Normalized mean squared error"
            ]
        );
    }

    #[test]
    fn test_instance_selector() {
        let (x, y) = regression_data();
        let mut trainer = ClickbaitModel::new();
        trainer
            .regress(&x, &y, Model::Ridge(Ridge::new(3.5)), false)
            .unwrap();
        match trainer.trained().unwrap().model() {
            Model::Ridge(ridge) => assert_eq!(ridge.alpha, 3.5),
            other => panic!("unexpected family {}", other.family()),
        }
    }

    #[test]
    fn test_failures_keep_previous_model() {
        let (x, y) = regression_data();
        let mut trainer = ClickbaitModel::new();
        trainer.regress(&x, &y, "Ridge", false).unwrap();

        assert!(matches!(
            trainer.regress(&x, &y, "Perceptron", false),
            Err(ClickbaitError::UnknownModel(_))
        ));
        assert!(matches!(
            trainer.classify(&x, &y, "Ridge", false),
            Err(ClickbaitError::Configuration(_))
        ));
        assert!(matches!(
            trainer.classify(&x, &y, "LogisticRegression", false),
            Err(ClickbaitError::Data(_))
        ));
        assert!(matches!(
            trainer.regress(&x, &array![1.0, 2.0], "Ridge", false),
            Err(ClickbaitError::Data(_))
        ));
        assert_eq!(trainer.trained().unwrap().family(), "Ridge");
    }

    #[test]
    fn test_predict_errors() {
        let (x, y) = regression_data();
        let mut trainer = ClickbaitModel::new();
        assert!(matches!(
            trainer.predict(&x),
            Err(ClickbaitError::NoTrainedModel(_))
        ));

        trainer.regress(&x, &y, "Ridge", false).unwrap();
        let narrow = FeatureMatrix::from_dense(&array![[1.0]]);
        assert!(matches!(
            trainer.predict(&narrow),
            Err(ClickbaitError::Data(_))
        ));
    }

    #[test]
    fn test_ridge_on_wide_sparse_features() {
        // 2000 rows over two million columns: a dense copy would need 32 TB
        let n_features = 2_000_000;
        let mut x = FeatureMatrix::new(n_features);
        let mut y = Array1::zeros(2_000);
        for i in 0..2_000 {
            let signal = i as f64 / 2_000.0;
            x.push_row(&[(0, signal), (1 + i * 997, 1.0)]).unwrap();
            y[i] = 4.0 * signal + 1.0;
        }

        let mut trainer = ClickbaitModel::new();
        trainer
            .regress(&x, &y, Model::Ridge(Ridge::new(1.0)), false)
            .unwrap();
        assert_eq!(trainer.trained().unwrap().n_features(), n_features);

        let predicted = trainer.predict(&x).unwrap();
        assert!(predicted.iter().all(|p| p.is_finite()));
        assert!(predicted[1_999] > predicted[0]);

        let report = trainer.regress(&x, &y, "Ridge", true).unwrap().unwrap();
        assert_eq!(report.n_train + report.n_test, 2_000);
    }

    #[test]
    fn test_linear_svr_beyond_ten_thousand_rows() {
        let n = 10_001;
        let dense = Array2::from_shape_fn((n, 1), |(i, _)| i as f64 / 10_000.0);
        let y = dense.column(0).mapv(|v| 2.0 * v + 1.0);
        let x = FeatureMatrix::from_dense(&dense);

        let mut trainer = ClickbaitModel::new();
        trainer.regress(&x, &y, "SVR_linear", false).unwrap();
        let predicted = trainer.predict(&x).unwrap();
        assert_eq!(predicted.len(), n);
        assert!(predicted.iter().all(|p| p.is_finite()));
        assert!(predicted[n - 1] > predicted[0]);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        let (x, y) = classification_data();

        let mut trainer = ClickbaitModel::new();
        assert!(matches!(
            trainer.save(&path),
            Err(ClickbaitError::NoTrainedModel(_))
        ));
        trainer
            .classify(&x, &y, "RandomForestClassifier", false)
            .unwrap();
        trainer.save(&path).unwrap();

        let mut restored = ClickbaitModel::new();
        restored.load(&path).unwrap();
        assert_eq!(restored.trained().unwrap().family(), "RandomForestClassifier");
        assert_eq!(restored.predict(&x).unwrap(), trainer.predict(&x).unwrap());
        assert_eq!(restored.scores(&x).unwrap(), trainer.scores(&x).unwrap());
    }

    #[test]
    fn test_corrupt_load_keeps_model() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        std::fs::write(&path, b"CBMD garbage").unwrap();

        let (x, y) = regression_data();
        let mut trainer = ClickbaitModel::new();
        trainer.regress(&x, &y, "Lasso", false).unwrap();
        assert!(matches!(
            trainer.load(&path),
            Err(ClickbaitError::CorruptState(_))
        ));
        assert_eq!(trainer.trained().unwrap().family(), "Lasso");
    }
}
