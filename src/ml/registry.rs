//! Model catalog: names mapped to factories of untrained models.

use ahash::AHashMap;

use crate::error::{ClickbaitError, Result};
use crate::ml::{
    ElasticNet, Estimator, Lasso, LogisticRegression, Model, MultinomialNB, RandomForest, Ridge,
    SgdRegressor, Svr, Task,
};

/// Produces a fresh, untrained model with fixed default hyperparameters.
pub type ModelFactory = fn() -> Model;

/// Catalog of model families by name.
///
/// ```
/// use clickbait::ml::{Model, ModelRegistry, Ridge};
///
/// let mut registry = ModelRegistry::default();
/// registry.register("StrongRidge", || Model::Ridge(Ridge::new(10.0)));
/// assert!(registry.contains("StrongRidge"));
/// assert!(registry.create("Perceptron").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    factories: AHashMap<String, ModelFactory>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        ModelRegistry {
            factories: AHashMap::new(),
        }
    }

    /// Registry holding every built-in family.
    pub fn with_builtin() -> Self {
        let mut registry = ModelRegistry::new();
        registry.register("LogisticRegression", || {
            Model::LogisticRegression(LogisticRegression::default())
        });
        registry.register("MultinomialNB", || Model::MultinomialNB(MultinomialNB::default()));
        registry.register("RandomForestClassifier", || {
            Model::RandomForest(RandomForest::classifier())
        });
        registry.register("SVR_linear", || Model::Svr(Svr::linear()));
        registry.register("SVR", || Model::Svr(Svr::rbf()));
        registry.register("Ridge", || Model::Ridge(Ridge::default()));
        registry.register("Lasso", || Model::Lasso(Lasso::default()));
        registry.register("ElasticNet", || Model::ElasticNet(ElasticNet::default()));
        registry.register("SGDRegressor", || Model::SgdRegressor(SgdRegressor::default()));
        registry.register("RandomForestRegressor", || {
            Model::RandomForest(RandomForest::regressor())
        });
        registry
    }

    /// Register (or replace) a factory under `name`.
    pub fn register<S: Into<String>>(&mut self, name: S, factory: ModelFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// A fresh untrained model.
    pub fn create(&self, name: &str) -> Result<Model> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| ClickbaitError::unknown_model(name))
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// `(name, task)` for every registered family, sorted by name.
    pub fn entries(&self) -> Vec<(&str, Task)> {
        self.names()
            .into_iter()
            .filter_map(|name| self.factories.get(name).map(|f| (name, f().task())))
            .collect()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
