//! Lexicon-based sentiment polarity.

use std::collections::HashSet;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::feature::text::{text_of, words};
use crate::feature::{FeatureOutput, FeatureUnit};
use crate::persist;
use crate::record::FieldValue;

const POSITIVE_WORDS: &[&str] = &[
    "adorable", "amazing", "awesome", "beautiful", "best", "better", "brilliant", "celebrate",
    "charming", "cheerful", "cool", "cute", "delight", "delighted", "delightful", "easy",
    "enjoy", "excellent", "excited", "exciting", "fabulous", "fantastic", "favorite", "fine",
    "free", "fun", "funny", "genius", "glad", "good", "gorgeous", "great", "happy", "hero",
    "hilarious", "hope", "incredible", "inspiring", "joy", "kind", "like", "love", "loved",
    "lovely", "lucky", "magic", "nice", "perfect", "pleasant", "positive", "pretty", "proud",
    "remarkable", "smart", "stunning", "success", "super", "sweet", "thrilled", "top", "win",
    "winner", "wonderful", "wow",
];

const NEGATIVE_WORDS: &[&str] = &[
    "abuse", "afraid", "angry", "annoying", "attack", "awful", "bad", "broke", "broken",
    "crash", "crazy", "crime", "crisis", "cruel", "cry", "damage", "danger", "dangerous",
    "dead", "death", "destroy", "die", "died", "disaster", "disgusting", "dumb", "evil",
    "fail", "failed", "fake", "fear", "fight", "furious", "hate", "horrible", "hurt", "ill",
    "kill", "killed", "lose", "loss", "mad", "miserable", "nasty", "negative", "pain",
    "poor", "problem", "sad", "scandal", "scary", "shame", "shock", "shocking", "sick",
    "stupid", "terrible", "terror", "threat", "tragic", "ugly", "upset", "victim", "violent",
    "war", "weak", "worse", "worst", "wrong",
];

const NEGATORS: &[&str] = &["not", "no", "never", "nothing", "nor", "without"];

static POSITIVE: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| POSITIVE_WORDS.iter().copied().collect());

static NEGATIVE: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| NEGATIVE_WORDS.iter().copied().collect());

fn is_negator(word: &str) -> bool {
    NEGATORS.contains(&word) || word.ends_with("n't")
}

/// Polarity in `[-1, 1]`: `(positive - negative) / (positive + negative)`.
///
/// A negator flips the polarity of the next sentiment-bearing word, so
/// "not good" counts as negative. Text without sentiment words scores 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentPolarity;

impl SentimentPolarity {
    pub fn polarity(text: &str) -> Result<f64> {
        let mut positive = 0usize;
        let mut negative = 0usize;
        let mut negated = false;

        for word in words(text)? {
            if is_negator(&word) {
                negated = true;
                continue;
            }
            let sign = if POSITIVE.contains(word.as_str()) {
                1
            } else if NEGATIVE.contains(word.as_str()) {
                -1
            } else {
                continue;
            };
            let sign = if negated { -sign } else { sign };
            negated = false;
            if sign > 0 {
                positive += 1;
            } else {
                negative += 1;
            }
        }

        let total = positive + negative;
        if total == 0 {
            return Ok(0.0);
        }
        Ok((positive as f64 - negative as f64) / total as f64)
    }
}

impl FeatureUnit for SentimentPolarity {
    fn kind(&self) -> &'static str {
        "sentiment_polarity"
    }

    fn width(&self) -> Option<usize> {
        Some(1)
    }

    fn transform(&self, value: &FieldValue) -> Result<FeatureOutput> {
        let text = text_of("sentiment_polarity", value)?;
        Ok(FeatureOutput::Scalar(Self::polarity(&text)?))
    }

    fn box_clone(&self) -> Box<dyn FeatureUnit> {
        Box::new(*self)
    }

    fn save_state(&self) -> Result<Vec<u8>> {
        persist::encode(self)
    }
}
