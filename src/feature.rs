//! Feature units: transformers from one raw field value to numbers.
//!
//! A [`FeatureUnit`] is bound to a field name inside a
//! [`FeatureSchema`](crate::schema::FeatureSchema). Units come in two flavours:
//!
//! - stateless units (word counts, readability, part of day) that can
//!   transform a value right away and report their width up front
//! - fitted units (n-gram tf-idf) whose width is only known after
//!   [`FeatureUnit::fit`] has seen the training corpus
//!
//! Every unit can serialize its state; [`registry::UnitRegistry`] maps the
//! unit's [`kind`](FeatureUnit::kind) back to a loader when a schema is read
//! from disk.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ClickbaitError, Result};
use crate::record::FieldValue;

pub mod contains_words;
pub mod ngram;
pub mod post;
pub mod readability;
pub mod registry;
pub mod sentiment;
pub mod surface;
pub mod text;

pub use contains_words::ContainsWordsFeature;
pub use ngram::{NGramAnalyzer, NGramFeature};
pub use post::{HasMediaAttached, PartOfDay};
pub use readability::FleschKincaidScore;
pub use registry::UnitRegistry;
pub use sentiment::SentimentPolarity;
pub use surface::{CharacterSum, LongestWordLength, MeanWordLength, StartsWithNumber};

/// A transformer from one field value to a numeric output.
pub trait FeatureUnit: Send + Sync + fmt::Debug {
    /// Registry key used to restore the unit from persisted state.
    fn kind(&self) -> &'static str;

    /// Whether [`fit`](Self::fit) must run before [`transform`](Self::transform).
    fn requires_fit(&self) -> bool {
        false
    }

    /// Learn unit state from the designated field of every training record.
    fn fit(&mut self, _values: &[&FieldValue]) -> Result<()> {
        Ok(())
    }

    /// Output width, or `None` while a fitted unit has not been fit yet.
    fn width(&self) -> Option<usize>;

    /// Transform one field value.
    fn transform(&self, value: &FieldValue) -> Result<FeatureOutput>;

    /// Clone into a new boxed unit.
    fn box_clone(&self) -> Box<dyn FeatureUnit>;

    /// Serialize the unit's configuration and fitted state.
    fn save_state(&self) -> Result<Vec<u8>>;
}

impl Clone for Box<dyn FeatureUnit> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Output of a single unit for a single record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureOutput {
    Scalar(f64),
    Dense(Vec<f64>),
    Sparse(SparseVector),
}

impl FeatureOutput {
    pub fn width(&self) -> usize {
        match self {
            FeatureOutput::Scalar(_) => 1,
            FeatureOutput::Dense(values) => values.len(),
            FeatureOutput::Sparse(vector) => vector.width(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, FeatureOutput::Sparse(_))
    }

    /// Non-zero entries as (column within the unit, value), in column order.
    pub fn nonzero(&self) -> Vec<(usize, f64)> {
        match self {
            FeatureOutput::Scalar(v) if *v != 0.0 => vec![(0, *v)],
            FeatureOutput::Scalar(_) => Vec::new(),
            FeatureOutput::Dense(values) => values
                .iter()
                .enumerate()
                .filter(|(_, v)| **v != 0.0)
                .map(|(i, v)| (i, *v))
                .collect(),
            FeatureOutput::Sparse(vector) => vector
                .entries()
                .iter()
                .filter(|(_, v)| *v != 0.0)
                .copied()
                .collect(),
        }
    }

    /// Dense view of the output.
    pub fn to_dense(&self) -> Vec<f64> {
        match self {
            FeatureOutput::Scalar(v) => vec![*v],
            FeatureOutput::Dense(values) => values.clone(),
            FeatureOutput::Sparse(vector) => vector.to_dense(),
        }
    }
}

/// A sparse vector of fixed width with entries sorted by index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    width: usize,
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    /// Create a sparse vector. Entries are sorted by index; duplicates are summed.
    pub fn new(width: usize, mut entries: Vec<(usize, f64)>) -> Result<Self> {
        if let Some((index, _)) = entries.iter().find(|(i, _)| *i >= width) {
            return Err(ClickbaitError::data(format!(
                "sparse index {index} out of range for width {width}"
            )));
        }
        entries.sort_by_key(|(i, _)| *i);
        let mut merged: Vec<(usize, f64)> = Vec::with_capacity(entries.len());
        for (index, value) in entries {
            match merged.last_mut() {
                Some((last, sum)) if *last == index => *sum += value,
                _ => merged.push((index, value)),
            }
        }
        Ok(SparseVector {
            width,
            entries: merged,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn to_dense(&self) -> Vec<f64> {
        let mut dense = vec![0.0; self.width];
        for (index, value) in &self.entries {
            dense[*index] = *value;
        }
        dense
    }
}
