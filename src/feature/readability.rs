//! Flesch-Kincaid grade level.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::feature::text::{count_sentences, count_syllables, text_of, words};
use crate::feature::{FeatureOutput, FeatureUnit};
use crate::persist;
use crate::record::FieldValue;

/// US school grade needed to read the text:
/// `0.39 * words/sentences + 11.8 * syllables/words - 15.59`.
///
/// Text without words scores 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FleschKincaidScore;

impl FleschKincaidScore {
    pub fn grade_level(text: &str) -> Result<f64> {
        let tokens = words(text)?;
        if tokens.is_empty() {
            return Ok(0.0);
        }
        let n_words = tokens.len() as f64;
        let n_sentences = count_sentences(text) as f64;
        let n_syllables: usize = tokens.iter().map(|w| count_syllables(w)).sum();

        Ok(0.39 * (n_words / n_sentences) + 11.8 * (n_syllables as f64 / n_words) - 15.59)
    }
}

impl FeatureUnit for FleschKincaidScore {
    fn kind(&self) -> &'static str {
        "flesch_kincaid"
    }

    fn width(&self) -> Option<usize> {
        Some(1)
    }

    fn transform(&self, value: &FieldValue) -> Result<FeatureOutput> {
        let text = text_of("flesch_kincaid", value)?;
        Ok(FeatureOutput::Scalar(Self::grade_level(&text)?))
    }

    fn box_clone(&self) -> Box<dyn FeatureUnit> {
        Box::new(*self)
    }

    fn save_state(&self) -> Result<Vec<u8>> {
        persist::encode(self)
    }
}
