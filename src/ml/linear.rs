//! Linear models: logistic regression, ridge, lasso and elastic net.
//!
//! Every family trains on CSR rows. Intercepts are fitted on column-centred
//! data, with the centring applied implicitly so sparse inputs stay sparse.
//! Only the dense ridge path materialises the centred matrix.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{ClickbaitError, Result};
use crate::matrix::FeatureMatrix;
use crate::ml::{
    Estimator, Task, check_binary_labels, check_fit_input, check_matrix_input,
    check_matrix_width, not_fitted,
};

/// Fitted weights of a linear model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearWeights {
    pub coefficients: Array1<f64>,
    pub intercept: f64,
}

impl LinearWeights {
    pub(crate) fn decision_matrix(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        check_matrix_width(self.coefficients.len(), x)?;
        Ok(x.dot(&self.coefficients) + self.intercept)
    }

    pub(crate) fn decision(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.decision_matrix(&FeatureMatrix::from_dense(x))
    }

    fn from_centered(coefficients: Array1<f64>, x_mean: &Array1<f64>, y_mean: f64) -> Self {
        let intercept = y_mean - coefficients.dot(x_mean);
        LinearWeights {
            coefficients,
            intercept,
        }
    }
}

/// Column-centred copy of the inputs, used to fit an intercept.
struct Centered {
    x: Array2<f64>,
    y: Array1<f64>,
    x_mean: Array1<f64>,
    y_mean: f64,
}

impl Centered {
    fn new(x: &Array2<f64>, y: &Array1<f64>) -> Self {
        let x_mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(x.ncols()));
        let y_mean = y.mean().unwrap_or(0.0);
        Centered {
            x: x - &x_mean.view().insert_axis(Axis(0)),
            y: y - y_mean,
            x_mean,
            y_mean,
        }
    }

    fn weights(&self, coefficients: Array1<f64>) -> LinearWeights {
        LinearWeights::from_centered(coefficients, &self.x_mean, self.y_mean)
    }
}

/// Column means and target mean of a CSR problem.
fn means(x: &FeatureMatrix, y: &Array1<f64>) -> (Array1<f64>, f64) {
    let n = x.nrows().max(1) as f64;
    (x.column_sums() / n, y.mean().unwrap_or(0.0))
}

fn cholesky_factor(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 || !diag.is_finite() {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }
    Some(l)
}

/// Solve `A x = b` for symmetric positive-definite `A`.
///
/// A near-singular `A` is retried once with a small diagonal jitter.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    let l = cholesky_factor(a).or_else(|| {
        let scale = a.diag().iter().map(|v| v.abs()).sum::<f64>() / n.max(1) as f64;
        let jitter = 1e-8 * scale.max(1.0);
        let mut regularized = a.clone();
        regularized.diag_mut().mapv_inplace(|v| v + jitter);
        cholesky_factor(&regularized)
    })?;

    // L y = b
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T x = y
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

fn check_penalty(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ClickbaitError::configuration(format!(
            "{name} must be a non-negative number, got {value}"
        )));
    }
    Ok(())
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Binary logistic regression fitted by full-batch gradient descent with an
/// L2 penalty on the coefficients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// L2 regularization strength
    pub alpha: f64,
    pub learning_rate: f64,
    pub max_iter: usize,
    /// Stop once the gradient norm drops below this
    pub tol: f64,
    weights: Option<LinearWeights>,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        LogisticRegression::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        LogisticRegression {
            alpha: 0.01,
            learning_rate: 0.1,
            max_iter: 1000,
            tol: 1e-6,
            weights: None,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn weights(&self) -> Option<&LinearWeights> {
        self.weights.as_ref()
    }

    /// Probability of class 1 for every row.
    pub fn predict_proba(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        let weights = self
            .weights
            .as_ref()
            .ok_or_else(|| not_fitted("LogisticRegression"))?;
        Ok(weights.decision_matrix(x)?.mapv(sigmoid))
    }
}

impl Estimator for LogisticRegression {
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
        self.weights.is_some()
    }

    fn fit_matrix(&mut self, x: &FeatureMatrix, y: &Array1<f64>) -> Result<()> {
        check_matrix_input(x, y)?;
        check_binary_labels(y)?;
        check_penalty("alpha", self.alpha)?;
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return Err(ClickbaitError::configuration(
                "learning rate must be positive",
            ));
        }

        let n_samples = x.nrows() as f64;
        let mut coefficients: Array1<f64> = Array1::zeros(x.ncols());
        let mut intercept = 0.0;

        for _ in 0..self.max_iter {
            let probabilities = (x.dot(&coefficients) + intercept).mapv(sigmoid);
            let errors = &probabilities - y;

            let grad_w = x.t_dot(&errors) / n_samples + &coefficients * self.alpha;
            let grad_b = errors.mean().unwrap_or(0.0);

            let norm = (grad_w.dot(&grad_w) + grad_b * grad_b).sqrt();
            if norm < self.tol {
                break;
            }

            coefficients.scaled_add(-self.learning_rate, &grad_w);
            intercept -= self.learning_rate * grad_b;
        }

        self.weights = Some(LinearWeights {
            coefficients,
            intercept,
        });
        Ok(())
    }

    fn predict_matrix(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        Ok(self
            .predict_proba(x)?
            .mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    fn scores_matrix(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        self.predict_proba(x)
    }
}

/// Conjugate gradients on `(Xcᵀ Xc + αI) w = Xcᵀ yc`, where `Xc` is `X` with
/// its column means subtracted. `Xc` is never formed: `Xc v = X v − (μ·v) 1`
/// and `Xcᵀ u = Xᵀ u − μ Σu`.
///
/// Returns the coefficients, the iterations run, and whether the residual
/// reached `tol`.
fn conjugate_gradient(
    x: &FeatureMatrix,
    yc: &Array1<f64>,
    x_mean: &Array1<f64>,
    alpha: f64,
    max_iter: usize,
    tol: f64,
) -> (Array1<f64>, usize, bool) {
    let apply = |v: &Array1<f64>| -> Array1<f64> {
        let xv = x.dot(v) - x_mean.dot(v);
        let mut out = x.t_dot(&xv) - &(x_mean * xv.sum());
        out.scaled_add(alpha, v);
        out
    };

    let b = x.t_dot(yc) - &(x_mean * yc.sum());
    let mut w: Array1<f64> = Array1::zeros(x.ncols());
    let b_norm = b.dot(&b).sqrt();
    if b_norm == 0.0 {
        return (w, 0, true);
    }

    let mut r = b;
    let mut p = r.clone();
    let mut rs = r.dot(&r);
    for iteration in 1..=max_iter {
        let ap = apply(&p);
        let curvature = p.dot(&ap);
        if !(curvature.is_finite() && curvature > 0.0) {
            return (w, iteration, false);
        }
        let step = rs / curvature;
        w.scaled_add(step, &p);
        r.scaled_add(-step, &ap);

        let rs_next = r.dot(&r);
        if rs_next.sqrt() <= tol * b_norm {
            return (w, iteration, true);
        }
        p = &r + &(p * (rs_next / rs));
        rs = rs_next;
    }
    (w, max_iter, false)
}

/// L2-regularized least squares.
///
/// Dense input is solved in closed form. With more features than samples the
/// dual system `(X Xᵀ + αI) a = y` is solved instead of the primal one.
/// CSR input is solved by conjugate gradients on the normal equations, which
/// touches only the stored cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ridge {
    pub alpha: f64,
    /// Conjugate-gradient iteration cap for CSR input
    pub max_iter: usize,
    /// Relative residual at which conjugate gradients stop
    pub tol: f64,
    weights: Option<LinearWeights>,
}

impl Default for Ridge {
    fn default() -> Self {
        Ridge::new(1.0)
    }
}

impl Ridge {
    pub fn new(alpha: f64) -> Self {
        Ridge {
            alpha,
            max_iter: 1000,
            tol: 1e-10,
            weights: None,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn weights(&self) -> Option<&LinearWeights> {
        self.weights.as_ref()
    }
}

impl Estimator for Ridge {
    fn task(&self) -> Task {
        Task::Regression
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        check_penalty("alpha", self.alpha)?;

        let centered = Centered::new(x, y);
        let (n_samples, n_features) = centered.x.dim();

        let solution = if n_features <= n_samples {
            let mut gram = centered.x.t().dot(&centered.x);
            gram.diag_mut().mapv_inplace(|v| v + self.alpha);
            let rhs = centered.x.t().dot(&centered.y);
            cholesky_solve(&gram, &rhs)
        } else {
            let mut kernel = centered.x.dot(&centered.x.t());
            kernel.diag_mut().mapv_inplace(|v| v + self.alpha);
            cholesky_solve(&kernel, &centered.y).map(|dual| centered.x.t().dot(&dual))
        };
        let coefficients = solution.ok_or_else(|| {
            ClickbaitError::data("ridge system is singular; use a positive alpha")
        })?;

        self.weights = Some(centered.weights(coefficients));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.predict_matrix(&FeatureMatrix::from_dense(x))
    }

    fn is_fitted(&self) -> bool {
        self.weights.is_some()
    }

    fn fit_matrix(&mut self, x: &FeatureMatrix, y: &Array1<f64>) -> Result<()> {
        check_matrix_input(x, y)?;
        check_penalty("alpha", self.alpha)?;

        let (x_mean, y_mean) = means(x, y);
        let yc = y - y_mean;
        let (coefficients, iterations, converged) =
            conjugate_gradient(x, &yc, &x_mean, self.alpha, self.max_iter, self.tol);
        if coefficients.iter().any(|w| !w.is_finite()) {
            return Err(ClickbaitError::data(
                "ridge solver produced non-finite coefficients; use a positive alpha",
            ));
        }
        if converged {
            log::debug!("ridge conjugate gradients converged after {iterations} iterations");
        } else {
            log::warn!(
                "ridge conjugate gradients stopped after {iterations} iterations without reaching tol {}",
                self.tol
            );
        }

        self.weights = Some(LinearWeights::from_centered(coefficients, &x_mean, y_mean));
        Ok(())
    }

    fn predict_matrix(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        self.weights
            .as_ref()
            .ok_or_else(|| not_fitted("Ridge"))?
            .decision_matrix(x)
    }
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

/// Cyclic coordinate descent for
/// `1/(2n) ||y - Xw||² + l1 ||w||₁ + l2/2 ||w||²` on implicitly centred data.
///
/// Columns come from the transposed matrix. The residual is kept as a stored
/// vector plus a scalar shift, so a coordinate update costs one pass over the
/// column's stored cells.
fn coordinate_descent(
    x: &FeatureMatrix,
    y: &Array1<f64>,
    l1: f64,
    l2: f64,
    max_iter: usize,
    tol: f64,
) -> LinearWeights {
    let n = x.nrows() as f64;
    let n_features = x.ncols();
    let l1_penalty = l1 * n;
    let l2_penalty = l2 * n;

    let columns = x.transpose();
    let column_sums = x.column_sums();
    let (x_mean, y_mean) = means(x, y);

    // squared norms of the centred columns
    let column_norms: Vec<f64> = (0..n_features)
        .map(|j| {
            let raw: f64 = columns.row(j).1.iter().map(|v| v * v).sum();
            let centred = raw - n * x_mean[j] * x_mean[j];
            if centred <= raw * 1e-12 { 0.0 } else { centred }
        })
        .collect();

    let mut w: Array1<f64> = Array1::zeros(n_features);
    // residual = stored + shift
    let mut stored = y - y_mean;
    let mut stored_sum = stored.sum();
    let mut shift = 0.0;

    for _ in 0..max_iter {
        let mut max_step: f64 = 0.0;
        for j in 0..n_features {
            let denominator = column_norms[j] + l2_penalty;
            if column_norms[j] == 0.0 || denominator < 1e-15 {
                continue;
            }
            let (rows, values) = columns.row(j);
            let residual_sum = stored_sum + n * shift;
            let dot: f64 = rows
                .iter()
                .zip(values)
                .map(|(i, v)| v * (stored[*i] + shift))
                .sum::<f64>()
                - x_mean[j] * residual_sum;

            let rho = dot + column_norms[j] * w[j];
            let updated = soft_threshold(rho, l1_penalty) / denominator;
            let delta = w[j] - updated;
            if delta != 0.0 {
                for (i, v) in rows.iter().zip(values) {
                    stored[*i] += delta * v;
                }
                stored_sum += delta * column_sums[j];
                shift -= delta * x_mean[j];
                w[j] = updated;
                max_step = max_step.max(delta.abs());
            }
        }
        if max_step < tol {
            break;
        }
    }

    LinearWeights::from_centered(w, &x_mean, y_mean)
}

/// L1-regularized least squares.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lasso {
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
    weights: Option<LinearWeights>,
}

impl Default for Lasso {
    fn default() -> Self {
        Lasso::new(1.0)
    }
}

impl Lasso {
    pub fn new(alpha: f64) -> Self {
        Lasso {
            alpha,
            max_iter: 1000,
            tol: 1e-6,
            weights: None,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn weights(&self) -> Option<&LinearWeights> {
        self.weights.as_ref()
    }
}

impl Estimator for Lasso {
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
        check_penalty("alpha", self.alpha)?;
        self.weights = Some(coordinate_descent(
            x,
            y,
            self.alpha,
            0.0,
            self.max_iter,
            self.tol,
        ));
        Ok(())
    }

    fn predict_matrix(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        self.weights
            .as_ref()
            .ok_or_else(|| not_fitted("Lasso"))?
            .decision_matrix(x)
    }
}

/// Least squares with a mixed L1/L2 penalty.
///
/// `l1_ratio = 1` is the lasso, `l1_ratio = 0` a ridge fitted iteratively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticNet {
    pub alpha: f64,
    pub l1_ratio: f64,
    pub max_iter: usize,
    pub tol: f64,
    weights: Option<LinearWeights>,
}

impl Default for ElasticNet {
    fn default() -> Self {
        ElasticNet::new(1.0, 0.5)
    }
}

impl ElasticNet {
    pub fn new(alpha: f64, l1_ratio: f64) -> Self {
        ElasticNet {
            alpha,
            l1_ratio,
            max_iter: 1000,
            tol: 1e-6,
            weights: None,
        }
    }

    pub fn weights(&self) -> Option<&LinearWeights> {
        self.weights.as_ref()
    }
}

impl Estimator for ElasticNet {
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
        check_penalty("alpha", self.alpha)?;
        if !(0.0..=1.0).contains(&self.l1_ratio) {
            return Err(ClickbaitError::configuration(format!(
                "l1_ratio must lie in [0, 1], got {}",
                self.l1_ratio
            )));
        }
        self.weights = Some(coordinate_descent(
            x,
            y,
            self.alpha * self.l1_ratio,
            self.alpha * (1.0 - self.l1_ratio),
            self.max_iter,
            self.tol,
        ));
        Ok(())
    }

    fn predict_matrix(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        self.weights
            .as_ref()
            .ok_or_else(|| not_fitted("ElasticNet"))?
            .decision_matrix(x)
    }
}
