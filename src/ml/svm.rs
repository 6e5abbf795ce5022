//! Epsilon-insensitive support vector regression.
//!
//! The dual problem is solved by cyclic coordinate descent with the bias
//! folded into the kernel (`K + 1`), which removes the equality constraint
//! of the classic formulation:
//!
//! ```text
//! min_β  ½ βᵀ(K + 1)β − yᵀβ + ε‖β‖₁    subject to  −C ≤ βᵢ ≤ C
//! f(x) = Σ βᵢ (k(xᵢ, x) + 1)
//! ```
//!
//! `Q = K + 1` is never materialised. The linear kernel keeps the primal
//! vector `w = Σ βᵢ xᵢ`, so `(Qβ)ᵢ = xᵢ · w + Σ β` costs one sparse row.
//! The RBF kernel computes columns of `Q` on demand and keeps the most
//! recently used ones in a cache bounded by [`Svr::cache_size`] megabytes.

use ahash::AHashMap;
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ClickbaitError, Result};
use crate::matrix::FeatureMatrix;
use crate::ml::{
    Estimator, Task, check_fit_input, check_matrix_input, check_matrix_width, not_fitted,
};

/// Kernel column cache, in megabytes.
const DEFAULT_CACHE_SIZE: usize = 200;

/// Kernel function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Kernel {
    /// k(a, b) = a · b
    Linear,
    /// k(a, b) = exp(−γ ‖a − b‖²); `None` means γ = 1 / n_features
    Rbf { gamma: Option<f64> },
}

impl Kernel {
    fn gamma(&self, n_features: usize) -> f64 {
        match self {
            Kernel::Linear => 0.0,
            Kernel::Rbf { gamma: Some(g) } => *g,
            Kernel::Rbf { gamma: None } => 1.0 / n_features.max(1) as f64,
        }
    }
}

/// RBF kernel from `a · b`, `‖a‖²` and `‖b‖²`.
fn rbf(gamma: f64, dot: f64, norm_a: f64, norm_b: f64) -> f64 {
    let distance = (norm_a + norm_b - 2.0 * dot).max(0.0);
    (-gamma * distance).exp()
}

fn rbf_column(x: &FeatureMatrix, norms: &Array1<f64>, gamma: f64, i: usize) -> Array1<f64> {
    let column: Vec<f64> = (0..x.nrows())
        .into_par_iter()
        .map(|j| rbf(gamma, x.rows_dot(i, x, j), norms[i], norms[j]) + 1.0)
        .collect();
    Array1::from(column)
}

/// Columns of the RBF `Q`, least recently used evicted first.
struct KernelCache<'a> {
    x: &'a FeatureMatrix,
    norms: Array1<f64>,
    gamma: f64,
    capacity: usize,
    columns: AHashMap<usize, (Array1<f64>, u64)>,
    clock: u64,
    computed: u64,
}

impl<'a> KernelCache<'a> {
    fn new(x: &'a FeatureMatrix, gamma: f64, cache_size: usize) -> Self {
        let column_bytes = x.nrows().max(1) * std::mem::size_of::<f64>();
        KernelCache {
            x,
            norms: x.row_norms_squared(),
            gamma,
            capacity: (cache_size.saturating_mul(1 << 20) / column_bytes).max(2),
            columns: AHashMap::new(),
            clock: 0,
            computed: 0,
        }
    }

    fn column(&mut self, i: usize) -> &Array1<f64> {
        self.clock += 1;
        let clock = self.clock;
        if !self.columns.contains_key(&i) {
            if self.columns.len() >= self.capacity {
                let oldest = self
                    .columns
                    .iter()
                    .min_by_key(|(_, (_, stamp))| *stamp)
                    .map(|(key, _)| *key);
                if let Some(key) = oldest {
                    self.columns.remove(&key);
                }
            }
            self.computed += 1;
        }

        let (x, norms, gamma) = (self.x, &self.norms, self.gamma);
        let entry = self
            .columns
            .entry(i)
            .or_insert_with(|| (rbf_column(x, norms, gamma, i), clock));
        entry.1 = clock;
        &entry.0
    }
}

/// Keeps `Qβ` current while coordinate descent moves one `βᵢ` at a time.
enum DualProducts<'a> {
    Linear {
        x: &'a FeatureMatrix,
        norms: Array1<f64>,
        w: Array1<f64>,
        sum_beta: f64,
    },
    Rbf {
        q_beta: Array1<f64>,
        cache: KernelCache<'a>,
    },
}

impl DualProducts<'_> {
    fn diagonal(&self, i: usize) -> f64 {
        match self {
            DualProducts::Linear { norms, .. } => norms[i] + 1.0,
            DualProducts::Rbf { .. } => 2.0,
        }
    }

    fn product(&self, i: usize) -> f64 {
        match self {
            DualProducts::Linear { x, w, sum_beta, .. } => x.row_dot(i, w) + sum_beta,
            DualProducts::Rbf { q_beta, .. } => q_beta[i],
        }
    }

    fn update(&mut self, i: usize, delta: f64) {
        match self {
            DualProducts::Linear { x, w, sum_beta, .. } => {
                x.add_row_to(i, delta, w);
                *sum_beta += delta;
            }
            DualProducts::Rbf { q_beta, cache } => q_beta.scaled_add(delta, cache.column(i)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SvrState {
    support_vectors: FeatureMatrix,
    dual_coef: Array1<f64>,
    bias: f64,
    gamma: f64,
    n_features: usize,
    /// `Σ βᵢ xᵢ`, linear kernel only
    coefficients: Option<Array1<f64>>,
}

/// Support vector regressor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Svr {
    kernel: Kernel,
    /// Box constraint on every dual coefficient
    pub c: f64,
    /// Half-width of the insensitive tube
    pub epsilon: f64,
    pub tol: f64,
    pub max_iter: usize,
    /// Kernel column cache in megabytes, RBF only. At least two columns are
    /// always kept.
    pub cache_size: usize,
    state: Option<SvrState>,
}

impl Svr {
    pub fn new(kernel: Kernel) -> Self {
        Svr {
            kernel,
            c: 1.0,
            epsilon: 0.1,
            tol: 1e-3,
            max_iter: 1000,
            cache_size: DEFAULT_CACHE_SIZE,
            state: None,
        }
    }

    pub fn linear() -> Self {
        Svr::new(Kernel::Linear)
    }

    /// RBF kernel with γ = 1 / n_features.
    pub fn rbf() -> Self {
        Svr::new(Kernel::Rbf { gamma: None })
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_cache_size(mut self, megabytes: usize) -> Self {
        self.cache_size = megabytes;
        self
    }

    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    pub fn n_support_vectors(&self) -> usize {
        self.state
            .as_ref()
            .map_or(0, |state| state.support_vectors.nrows())
    }

    fn soft_threshold(&self, z: f64) -> f64 {
        if z > self.epsilon {
            z - self.epsilon
        } else if z < -self.epsilon {
            z + self.epsilon
        } else {
            0.0
        }
    }
}

impl Estimator for Svr {
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
        self.state.is_some()
    }

    fn fit_matrix(&mut self, x: &FeatureMatrix, y: &Array1<f64>) -> Result<()> {
        check_matrix_input(x, y)?;
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(ClickbaitError::configuration(format!(
                "C must be positive, got {}",
                self.c
            )));
        }
        if !(self.epsilon.is_finite() && self.epsilon >= 0.0) {
            return Err(ClickbaitError::configuration(format!(
                "epsilon must be non-negative, got {}",
                self.epsilon
            )));
        }

        let n = x.nrows();
        let gamma = self.kernel.gamma(x.ncols());
        let mut products = match self.kernel {
            Kernel::Linear => DualProducts::Linear {
                x,
                norms: x.row_norms_squared(),
                w: Array1::zeros(x.ncols()),
                sum_beta: 0.0,
            },
            Kernel::Rbf { .. } => DualProducts::Rbf {
                q_beta: Array1::zeros(n),
                cache: KernelCache::new(x, gamma, self.cache_size),
            },
        };

        let mut beta: Array1<f64> = Array1::zeros(n);
        let mut epochs = 0;
        for _ in 0..self.max_iter {
            epochs += 1;
            let mut max_step: f64 = 0.0;
            for i in 0..n {
                let q_ii = products.diagonal(i);
                let gradient = products.product(i) - y[i];
                let z = q_ii * beta[i] - gradient;
                let updated = (self.soft_threshold(z) / q_ii).clamp(-self.c, self.c);
                let delta = updated - beta[i];
                if delta != 0.0 {
                    products.update(i, delta);
                    beta[i] = updated;
                    max_step = max_step.max(delta.abs());
                }
            }
            if max_step < self.tol {
                break;
            }
        }

        if beta.iter().any(|b| !b.is_finite()) {
            return Err(ClickbaitError::data("SVR produced non-finite dual coefficients"));
        }

        let support: Vec<usize> = (0..n).filter(|&i| beta[i] != 0.0).collect();
        let support_vectors = x.select_rows(&support)?;
        let dual_coef: Array1<f64> = support.iter().map(|&i| beta[i]).collect();
        let coefficients = match products {
            DualProducts::Linear { w, .. } => Some(w),
            DualProducts::Rbf { cache, .. } => {
                log::debug!(
                    "computed {} kernel columns, cache holds {}",
                    cache.computed,
                    cache.capacity
                );
                None
            }
        };

        log::debug!(
            "SVR converged after {epochs} epochs with {} support vectors",
            support.len()
        );
        self.state = Some(SvrState {
            bias: dual_coef.sum(),
            support_vectors,
            dual_coef,
            gamma,
            n_features: x.ncols(),
            coefficients,
        });
        Ok(())
    }

    fn predict_matrix(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        let state = self.state.as_ref().ok_or_else(|| not_fitted("SVR"))?;
        check_matrix_width(state.n_features, x)?;
        if let Some(w) = &state.coefficients {
            return Ok(x.dot(w) + state.bias);
        }

        let support = &state.support_vectors;
        let support_norms = support.row_norms_squared();
        let norms = x.row_norms_squared();
        let predicted: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                (0..support.nrows())
                    .map(|j| {
                        let dot = x.rows_dot(i, support, j);
                        state.dual_coef[j] * rbf(state.gamma, dot, norms[i], support_norms[j])
                    })
                    .sum::<f64>()
                    + state.bias
            })
            .collect();
        Ok(Array1::from(predicted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn curve() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((10, 1), |(i, _)| i as f64 * 0.5);
        let y = x.column(0).mapv(f64::sin);
        (x, y)
    }

    #[test]
    fn test_linear_kernel_fits_a_line() {
        let x = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
        let y = array![1.0, 3.0, 5.0, 7.0, 9.0];

        let mut model = Svr::linear();
        model.fit(&x, &y).unwrap();
        let predicted = model.predict(&x).unwrap();
        for (p, t) in predicted.iter().zip(y.iter()) {
            assert!((p - t).abs() < 0.15, "{p} vs {t}");
        }
    }

    #[test]
    fn test_rbf_kernel_fits_a_curve() {
        let (x, y) = curve();
        let mut model = Svr::rbf();
        model.fit(&x, &y).unwrap();
        let predicted = model.predict(&x).unwrap();
        for (p, t) in predicted.iter().zip(y.iter()) {
            assert!((p - t).abs() < 0.15, "{p} vs {t}");
        }
        assert!(model.n_support_vectors() > 0);
    }

    #[test]
    fn test_smallest_cache_gives_the_same_model() {
        let (x, y) = curve();
        let mut cached = Svr::rbf();
        cached.fit(&x, &y).unwrap();

        let mut evicting = Svr::rbf().with_cache_size(0);
        evicting.fit(&x, &y).unwrap();
        assert_eq!(evicting.predict(&x).unwrap(), cached.predict(&x).unwrap());
    }

    #[test]
    fn test_kernel_cache_evicts_least_recently_used() {
        let x = FeatureMatrix::from_dense(&array![[0.0], [1.0], [2.0]]);
        let mut cache = KernelCache::new(&x, 1.0, 0);
        assert_eq!(cache.capacity, 2);

        cache.column(0);
        cache.column(1);
        cache.column(0);
        cache.column(2);
        assert!(cache.columns.contains_key(&0));
        assert!(!cache.columns.contains_key(&1));
        assert_eq!(cache.computed, 3);

        let column = cache.column(2).clone();
        assert_eq!(column[2], 2.0);
        assert!((column[1] - ((-1.0_f64).exp() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_sparse_rows_match_dense_rows() {
        let (x, y) = curve();
        let mut dense = Svr::rbf();
        dense.fit(&x, &y).unwrap();

        let mut sparse = Svr::rbf();
        sparse.fit_matrix(&FeatureMatrix::from_dense(&x), &y).unwrap();
        assert_eq!(
            sparse.predict_matrix(&FeatureMatrix::from_dense(&x)).unwrap(),
            dense.predict(&x).unwrap()
        );
    }

    #[test]
    fn test_points_inside_the_tube_are_not_support_vectors() {
        let x = array![[0.0], [1.0], [2.0]];
        let y = array![0.05, -0.05, 0.0];
        let mut model = Svr::linear();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.n_support_vectors(), 0);
        assert_eq!(model.predict(&x).unwrap(), array![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_invalid_parameters() {
        let x = array![[0.0], [1.0]];
        let y = array![0.0, 1.0];
        assert!(Svr::linear().with_c(0.0).fit(&x, &y).is_err());
        assert!(Svr::linear().with_epsilon(-1.0).fit(&x, &y).is_err());
    }

    #[test]
    fn test_width_mismatch() {
        let mut model = Svr::rbf();
        model
            .fit(&array![[0.0, 1.0], [1.0, 0.0]], &array![0.0, 1.0])
            .unwrap();
        assert!(model.predict(&array![[1.0]]).is_err());

        let mut empty = Svr::linear();
        empty.fit(&array![[0.0], [1.0]], &array![0.0, 0.0]).unwrap();
        assert_eq!(empty.n_support_vectors(), 0);
        assert!(empty.predict(&array![[1.0, 2.0]]).is_err());
    }
}
