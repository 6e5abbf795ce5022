//! Seeded train/test splitting of sample indices.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::error::{ClickbaitError, Result};

/// Shuffle `0..n_samples` with a seeded generator and split off
/// `ceil(test_size * n_samples)` indices for testing.
///
/// Returns `(train, test)` row indices.
pub fn train_test_split(
    n_samples: usize,
    test_size: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(ClickbaitError::configuration(format!(
            "test_size must lie strictly between 0 and 1, got {test_size}"
        )));
    }
    let n_test = (test_size * n_samples as f64).ceil() as usize;
    if n_test == 0 || n_test >= n_samples {
        return Err(ClickbaitError::data(format!(
            "cannot split {n_samples} samples with test_size {test_size}: one side would be empty"
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    indices.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
    let train = indices.split_off(n_test);
    Ok((train, indices))
}
