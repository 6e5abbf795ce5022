//! Linear regression fitted by stochastic gradient descent.

use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ClickbaitError, Result};
use crate::matrix::FeatureMatrix;
use crate::ml::linear::LinearWeights;
use crate::ml::{Estimator, Task, check_fit_input, check_matrix_input, not_fitted};

/// Epochs without improvement before training stops.
const N_ITER_NO_CHANGE: usize = 5;

/// Below this the weight scale is folded back into the coefficients.
const MIN_WEIGHT_SCALE: f64 = 1e-9;

/// Squared-loss SGD with an L2 penalty and an inverse-scaling step size
/// `eta = eta0 / t^power_t`, where `t` counts every sample update.
///
/// The coefficients are kept as `scale * v`, so the L2 shrink of every
/// update is one multiplication and a step touches only the stored cells of
/// the sample's row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SgdRegressor {
    pub alpha: f64,
    pub eta0: f64,
    pub power_t: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub random_state: u64,
    weights: Option<LinearWeights>,
}

impl Default for SgdRegressor {
    fn default() -> Self {
        SgdRegressor {
            alpha: 1e-4,
            eta0: 0.01,
            power_t: 0.25,
            max_iter: 1000,
            tol: 1e-4,
            random_state: 42,
            weights: None,
        }
    }
}

impl SgdRegressor {
    pub fn new() -> Self {
        SgdRegressor::default()
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_eta0(mut self, eta0: f64) -> Self {
        self.eta0 = eta0;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn weights(&self) -> Option<&LinearWeights> {
        self.weights.as_ref()
    }
}

impl Estimator for SgdRegressor {
    fn task(&self) -> Task {
        Task::Regression
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        self.fit_matrix(&FeatureMatrix::from_dense(x), y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.predict_matrix(&FeatureMatrix::from_dense(x))
    }

    fn is_fitted(&self) -> bool {
        self.weights.is_some()
    }

    fn fit_matrix(&mut self, x: &FeatureMatrix, y: &Array1<f64>) -> Result<()> {
        check_matrix_input(x, y)?;
        if self.eta0.is_nan() || self.eta0 <= 0.0 {
            return Err(ClickbaitError::configuration(format!(
                "eta0 must be positive, got {}",
                self.eta0
            )));
        }
        if self.alpha.is_nan() || self.alpha < 0.0 {
            return Err(ClickbaitError::configuration(format!(
                "alpha must be non-negative, got {}",
                self.alpha
            )));
        }

        let n_samples = x.nrows();
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut order: Vec<usize> = (0..n_samples).collect();
        let mut direction: Array1<f64> = Array1::zeros(x.ncols());
        let mut scale = 1.0;
        let mut intercept = 0.0;
        let mut t = 1.0_f64;
        let mut best_loss = f64::INFINITY;
        let mut no_improvement = 0;
        let mut epochs = 0;

        for _ in 0..self.max_iter {
            epochs += 1;
            order.shuffle(&mut rng);
            let mut loss = 0.0;
            for &i in &order {
                let eta = self.eta0 / t.powf(self.power_t);
                let residual = scale * x.row_dot(i, &direction) + intercept - y[i];
                loss += 0.5 * residual * residual;

                scale *= 1.0 - eta * self.alpha;
                if scale.abs() < MIN_WEIGHT_SCALE {
                    direction *= scale;
                    scale = 1.0;
                }
                x.add_row_to(i, -eta * residual / scale, &mut direction);
                intercept -= eta * residual;
                t += 1.0;
            }
            loss /= n_samples as f64;

            if !loss.is_finite() || !intercept.is_finite() {
                return Err(ClickbaitError::data(
                    "SGD diverged, consider scaling the features or lowering eta0",
                ));
            }
            if loss > best_loss - self.tol {
                no_improvement += 1;
            } else {
                no_improvement = 0;
            }
            best_loss = best_loss.min(loss);
            if no_improvement >= N_ITER_NO_CHANGE {
                break;
            }
        }

        log::debug!("SGD stopped after {epochs} epochs, loss {best_loss:.6}");
        self.weights = Some(LinearWeights {
            coefficients: direction * scale,
            intercept,
        });
        Ok(())
    }

    fn predict_matrix(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        self.weights
            .as_ref()
            .ok_or_else(|| not_fitted("SGDRegressor"))?
            .decision_matrix(x)
    }
}
