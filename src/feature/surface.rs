//! Surface statistics of a text: first token, word lengths, character count.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::feature::text::{text_of, words};
use crate::feature::{FeatureOutput, FeatureUnit};
use crate::persist;
use crate::record::FieldValue;

/// 1.0 when the first word starts with a digit ("10 things you ...").
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StartsWithNumber;

impl FeatureUnit for StartsWithNumber {
    fn kind(&self) -> &'static str {
        "starts_with_number"
    }

    fn width(&self) -> Option<usize> {
        Some(1)
    }

    fn transform(&self, value: &FieldValue) -> Result<FeatureOutput> {
        let text = text_of("starts_with_number", value)?;
        let starts = words(&text)?
            .first()
            .and_then(|w| w.chars().next())
            .is_some_and(|c| c.is_numeric());
        Ok(FeatureOutput::Scalar(if starts { 1.0 } else { 0.0 }))
    }

    fn box_clone(&self) -> Box<dyn FeatureUnit> {
        Box::new(*self)
    }

    fn save_state(&self) -> Result<Vec<u8>> {
        persist::encode(self)
    }
}

/// Character length of the longest word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LongestWordLength;

impl FeatureUnit for LongestWordLength {
    fn kind(&self) -> &'static str {
        "longest_word_length"
    }

    fn width(&self) -> Option<usize> {
        Some(1)
    }

    fn transform(&self, value: &FieldValue) -> Result<FeatureOutput> {
        let text = text_of("longest_word_length", value)?;
        let longest = words(&text)?
            .iter()
            .map(|w| w.chars().count())
            .max()
            .unwrap_or(0);
        Ok(FeatureOutput::Scalar(longest as f64))
    }

    fn box_clone(&self) -> Box<dyn FeatureUnit> {
        Box::new(*self)
    }

    fn save_state(&self) -> Result<Vec<u8>> {
        persist::encode(self)
    }
}

/// Mean character length of the words.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MeanWordLength;

impl FeatureUnit for MeanWordLength {
    fn kind(&self) -> &'static str {
        "mean_word_length"
    }

    fn width(&self) -> Option<usize> {
        Some(1)
    }

    fn transform(&self, value: &FieldValue) -> Result<FeatureOutput> {
        let text = text_of("mean_word_length", value)?;
        let tokens = words(&text)?;
        if tokens.is_empty() {
            return Ok(FeatureOutput::Scalar(0.0));
        }
        let total: usize = tokens.iter().map(|w| w.chars().count()).sum();
        Ok(FeatureOutput::Scalar(total as f64 / tokens.len() as f64))
    }

    fn box_clone(&self) -> Box<dyn FeatureUnit> {
        Box::new(*self)
    }

    fn save_state(&self) -> Result<Vec<u8>> {
        persist::encode(self)
    }
}

/// Number of characters in the text, whitespace and punctuation included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterSum;

impl FeatureUnit for CharacterSum {
    fn kind(&self) -> &'static str {
        "character_sum"
    }

    fn width(&self) -> Option<usize> {
        Some(1)
    }

    fn transform(&self, value: &FieldValue) -> Result<FeatureOutput> {
        let text = text_of("character_sum", value)?;
        Ok(FeatureOutput::Scalar(text.chars().count() as f64))
    }

    fn box_clone(&self) -> Box<dyn FeatureUnit> {
        Box::new(*self)
    }

    fn save_state(&self) -> Result<Vec<u8>> {
        persist::encode(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(unit: &dyn FeatureUnit, text: &str) -> f64 {
        match unit.transform(&FieldValue::Text(text.into())).unwrap() {
            FeatureOutput::Scalar(v) => v,
            other => panic!("expected scalar, got {other:?}"),
        }
    }

    #[test]
    fn test_starts_with_number() {
        assert_eq!(scalar(&StartsWithNumber, "17 photos that will"), 1.0);
        assert_eq!(scalar(&StartsWithNumber, "\"5 reasons\""), 1.0);
        assert_eq!(scalar(&StartsWithNumber, "Top 10 reasons"), 0.0);
        assert_eq!(scalar(&StartsWithNumber, ""), 0.0);
    }

    #[test]
    fn test_word_lengths() {
        assert_eq!(scalar(&LongestWordLength, "a bb unbelievable"), 12.0);
        assert_eq!(scalar(&MeanWordLength, "a bb ccc"), 2.0);
        assert_eq!(scalar(&LongestWordLength, "..."), 0.0);
        assert_eq!(scalar(&MeanWordLength, "..."), 0.0);
    }

    #[test]
    fn test_character_sum() {
        assert_eq!(scalar(&CharacterSum, "Wow!"), 4.0);
        assert_eq!(scalar(&CharacterSum, "café"), 4.0);

        let list = FieldValue::TextList(vec!["ab".into(), "cd".into()]);
        assert_eq!(
            CharacterSum.transform(&list).unwrap(),
            FeatureOutput::Scalar(5.0)
        );
    }

    #[test]
    fn test_units_are_stateless() {
        for unit in [
            Box::new(StartsWithNumber) as Box<dyn FeatureUnit>,
            Box::new(LongestWordLength),
            Box::new(MeanWordLength),
            Box::new(CharacterSum),
        ] {
            assert!(!unit.requires_fit());
            assert_eq!(unit.width(), Some(1));
        }
    }
}
