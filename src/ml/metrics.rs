//! Classification and regression metrics.
//!
//! Each task has a fixed, ordered metric set. Classification metrics treat
//! 1 as the positive class; ROC-AUC is computed from continuous scores, all
//! other metrics from the predicted values.

use serde::{Deserialize, Serialize};

use crate::ml::Task;

/// Which model output a measure consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureInput {
    /// Predicted labels or values.
    Values,
    /// Continuous ranking scores.
    Scores,
}

/// A named metric `f(truth, predicted)`.
#[derive(Debug, Clone, Copy)]
pub struct Measure {
    pub name: &'static str,
    pub input: MeasureInput,
    pub compute: fn(&[f64], &[f64]) -> f64,
}

const fn values(name: &'static str, compute: fn(&[f64], &[f64]) -> f64) -> Measure {
    Measure {
        name,
        input: MeasureInput::Values,
        compute,
    }
}

pub static CLASSIFICATION_MEASURES: &[Measure] = &[
    values("Accuracy", accuracy_score),
    values("Precision", precision_score),
    values("Recall", recall_score),
    values("F1 score", f1_score),
    Measure {
        name: "ROC-AUC",
        input: MeasureInput::Scores,
        compute: roc_auc_score,
    },
];

pub static REGRESSION_MEASURES: &[Measure] = &[
    values("Explained variance", explained_variance_score),
    values("Mean absolute error", mean_absolute_error),
    values("Mean squared error", mean_squared_error),
    values("Median absolute error", median_absolute_error),
    values("R2 score", r2_score),
    values("Normalized mean squared error", normalized_mean_squared_error),
];

pub fn measures(task: Task) -> &'static [Measure] {
    match task {
        Task::Classification => CLASSIFICATION_MEASURES,
        Task::Regression => REGRESSION_MEASURES,
    }
}

struct Confusion {
    tp: f64,
    fp: f64,
    fn_: f64,
    tn: f64,
}

impl Confusion {
    fn new(truth: &[f64], predicted: &[f64]) -> Self {
        let mut c = Confusion {
            tp: 0.0,
            fp: 0.0,
            fn_: 0.0,
            tn: 0.0,
        };
        for (t, p) in truth.iter().zip(predicted) {
            match (*t == 1.0, *p == 1.0) {
                (true, true) => c.tp += 1.0,
                (false, true) => c.fp += 1.0,
                (true, false) => c.fn_ += 1.0,
                (false, false) => c.tn += 1.0,
            }
        }
        c
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 { f64::NAN } else { sum / count as f64 }
}

fn variance(values: &[f64]) -> f64 {
    let m = mean(values.iter().copied());
    mean(values.iter().map(|v| (v - m) * (v - m)))
}

/// `1 - num/den`, with 1.0 for a perfect fit and 0.0 otherwise when `den` is 0.
fn one_minus_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        if numerator == 0.0 { 1.0 } else { 0.0 }
    } else {
        1.0 - numerator / denominator
    }
}

pub fn accuracy_score(truth: &[f64], predicted: &[f64]) -> f64 {
    let c = Confusion::new(truth, predicted);
    ratio(c.tp + c.tn, truth.len() as f64)
}

pub fn precision_score(truth: &[f64], predicted: &[f64]) -> f64 {
    let c = Confusion::new(truth, predicted);
    ratio(c.tp, c.tp + c.fp)
}

pub fn recall_score(truth: &[f64], predicted: &[f64]) -> f64 {
    let c = Confusion::new(truth, predicted);
    ratio(c.tp, c.tp + c.fn_)
}

pub fn f1_score(truth: &[f64], predicted: &[f64]) -> f64 {
    let c = Confusion::new(truth, predicted);
    ratio(2.0 * c.tp, 2.0 * c.tp + c.fp + c.fn_)
}

/// Area under the ROC curve from the Mann-Whitney U statistic.
///
/// Tied scores share their average rank. Returns NaN unless both classes
/// are present.
pub fn roc_auc_score(truth: &[f64], scores: &[f64]) -> f64 {
    let n_pos = truth.iter().filter(|t| **t == 1.0).count();
    let n_neg = truth.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return f64::NAN;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // ranks are 1-based, a tie group gets the mean of its ranks
        let rank = (start + end + 1) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = rank;
        }
        start = end;
    }

    let positive_rank_sum: f64 = truth
        .iter()
        .zip(&ranks)
        .filter(|(t, _)| **t == 1.0)
        .map(|(_, r)| r)
        .sum();
    let n_pos = n_pos as f64;
    let u = positive_rank_sum - n_pos * (n_pos + 1.0) / 2.0;
    u / (n_pos * n_neg as f64)
}

pub fn explained_variance_score(truth: &[f64], predicted: &[f64]) -> f64 {
    let residuals: Vec<f64> = truth.iter().zip(predicted).map(|(t, p)| t - p).collect();
    one_minus_ratio(variance(&residuals), variance(truth))
}

pub fn mean_absolute_error(truth: &[f64], predicted: &[f64]) -> f64 {
    mean(truth.iter().zip(predicted).map(|(t, p)| (t - p).abs()))
}

pub fn mean_squared_error(truth: &[f64], predicted: &[f64]) -> f64 {
    mean(truth.iter().zip(predicted).map(|(t, p)| (t - p) * (t - p)))
}

pub fn median_absolute_error(truth: &[f64], predicted: &[f64]) -> f64 {
    let mut errors: Vec<f64> = truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p).abs())
        .collect();
    if errors.is_empty() {
        return f64::NAN;
    }
    errors.sort_by(f64::total_cmp);
    let mid = errors.len() / 2;
    if errors.len() % 2 == 0 {
        (errors[mid - 1] + errors[mid]) / 2.0
    } else {
        errors[mid]
    }
}

pub fn r2_score(truth: &[f64], predicted: &[f64]) -> f64 {
    let m = mean(truth.iter().copied());
    let ss_res: f64 = truth.iter().zip(predicted).map(|(t, p)| (t - p) * (t - p)).sum();
    let ss_tot: f64 = truth.iter().map(|t| (t - m) * (t - m)).sum();
    one_minus_ratio(ss_res, ss_tot)
}

/// MSE of the predictions over the MSE of always predicting the mean.
///
/// NaN when the truth has zero variance.
pub fn normalized_mean_squared_error(truth: &[f64], predicted: &[f64]) -> f64 {
    let baseline = variance(truth);
    if baseline == 0.0 || baseline.is_nan() {
        return f64::NAN;
    }
    mean_squared_error(truth, predicted) / baseline
}

/// Held-out metrics of one evaluated training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub task: Task,
    pub family: String,
    pub n_train: usize,
    pub n_test: usize,
    pub metrics: Vec<(String, f64)>,
}

impl EvaluationReport {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|(metric, _)| metric == name)
            .map(|(_, value)| *value)
    }
}

/// Every metric of the task's set, in set order.
pub fn evaluate(task: Task, truth: &[f64], values: &[f64], scores: &[f64]) -> Vec<(String, f64)> {
    measures(task)
        .iter()
        .map(|measure| {
            let input = match measure.input {
                MeasureInput::Values => values,
                MeasureInput::Scores => scores,
            };
            (measure.name.to_string(), (measure.compute)(truth, input))
        })
        .collect()
}
