//! Word-list membership counts.
//!
//! One unit covers a family of lexicon features: stop-word ratio, easy-word
//! ratio, clickbait phrase counts, abbreviation presence, hashtag and mention
//! counts, and one unit per General Inquirer category.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::feature::text::{text_of, words};
use crate::feature::{FeatureOutput, FeatureUnit};
use crate::persist;
use crate::record::FieldValue;

/// Counts occurrences of word-list entries in a text.
///
/// With `only_words` (the default) entries are matched against word tokens;
/// multi-word entries match a run of consecutive tokens. Without it, every
/// non-overlapping substring occurrence in the lower-cased text counts, which
/// is what symbol lists such as `#` or `@` need.
///
/// ```
/// use clickbait::feature::{ContainsWordsFeature, FeatureOutput, FeatureUnit};
/// use clickbait::record::FieldValue;
///
/// let hashtags = ContainsWordsFeature::from_words(["#"]).only_words(false);
/// let value = FieldValue::Text("#breaking #news".into());
/// assert_eq!(hashtags.transform(&value).unwrap(), FeatureOutput::Scalar(2.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainsWordsFeature {
    source: String,
    entries: Vec<String>,
    single: BTreeSet<String>,
    phrases: Vec<Vec<String>>,
    only_words: bool,
    ratio: bool,
    binary: bool,
}

impl ContainsWordsFeature {
    /// Build the unit from inline entries.
    pub fn from_words<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_source("inline", entries)
    }

    /// Build the unit from a word-list file: one entry per line, blank lines skipped.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let unit = Self::with_source(path.display().to_string(), content.lines());
        if unit.entries.is_empty() {
            log::warn!("word list {} has no entries", path.display());
        } else {
            log::debug!(
                "loaded {} entries from {}",
                unit.entries.len(),
                path.display()
            );
        }
        Ok(unit)
    }

    fn with_source<I, S>(source: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = BTreeSet::new();
        let mut kept = Vec::new();
        let mut single = BTreeSet::new();
        let mut phrases = Vec::new();

        for entry in entries {
            let entry = entry.as_ref().trim().to_lowercase();
            if entry.is_empty() || !seen.insert(entry.clone()) {
                continue;
            }
            // Entries without a word token (e.g. "#") can only match as substrings.
            let tokens = words(&entry).unwrap_or_default();
            match tokens.len() {
                0 => {}
                1 => {
                    single.extend(tokens);
                }
                _ => phrases.push(tokens),
            }
            kept.push(entry);
        }

        ContainsWordsFeature {
            source: source.into(),
            entries: kept,
            single,
            phrases,
            only_words: true,
            ratio: false,
            binary: false,
        }
    }

    /// Match word tokens (`true`) or raw substrings (`false`).
    pub fn only_words(mut self, only_words: bool) -> Self {
        self.only_words = only_words;
        self
    }

    /// Divide the count by the number of word tokens.
    pub fn ratio(mut self, ratio: bool) -> Self {
        self.ratio = ratio;
        self
    }

    /// Report 1.0 when any entry occurs, 0.0 otherwise.
    pub fn binary(mut self, binary: bool) -> Self {
        self.binary = binary;
        self
    }

    /// Where the entries came from: a file path or `inline`.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn count_tokens(&self, tokens: &[String]) -> usize {
        let singles = tokens.iter().filter(|t| self.single.contains(*t)).count();
        let phrases: usize = self
            .phrases
            .iter()
            .map(|phrase| {
                tokens
                    .windows(phrase.len())
                    .filter(|window| *window == phrase.as_slice())
                    .count()
            })
            .sum();
        singles + phrases
    }

    fn count_substrings(&self, text: &str) -> usize {
        let lowered = text.to_lowercase();
        self.entries
            .iter()
            .map(|entry| lowered.matches(entry.as_str()).count())
            .sum()
    }
}

impl FeatureUnit for ContainsWordsFeature {
    fn kind(&self) -> &'static str {
        "contains_words"
    }

    fn width(&self) -> Option<usize> {
        Some(1)
    }

    fn transform(&self, value: &FieldValue) -> Result<FeatureOutput> {
        let text = text_of("contains_words", value)?;
        let tokens = words(&text)?;

        let count = if self.only_words {
            self.count_tokens(&tokens)
        } else {
            self.count_substrings(&text)
        };

        let score = if self.binary {
            if count > 0 { 1.0 } else { 0.0 }
        } else if self.ratio {
            if tokens.is_empty() {
                0.0
            } else {
                count as f64 / tokens.len() as f64
            }
        } else {
            count as f64
        };
        Ok(FeatureOutput::Scalar(score))
    }

    fn box_clone(&self) -> Box<dyn FeatureUnit> {
        Box::new(self.clone())
    }

    fn save_state(&self) -> Result<Vec<u8>> {
        persist::encode(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn score(unit: &ContainsWordsFeature, text: &str) -> f64 {
        match unit.transform(&FieldValue::Text(text.into())).unwrap() {
            FeatureOutput::Scalar(v) => v,
            other => panic!("expected scalar, got {other:?}"),
        }
    }

    #[test]
    fn test_word_counts() {
        let unit = ContainsWordsFeature::from_words(["the", "a", "The"]);
        assert_eq!(unit.len(), 2);
        assert_eq!(score(&unit, "The cat saw a dog in the park"), 3.0);
        assert_eq!(score(&unit, "theatre"), 0.0);
    }

    #[test]
    fn test_ratio() {
        let unit = ContainsWordsFeature::from_words(["the"]).ratio(true);
        assert_eq!(score(&unit, "the end of the line"), 0.4);
        assert_eq!(score(&unit, ""), 0.0);
    }

    #[test]
    fn test_phrase_in_word_mode() {
        let unit = ContainsWordsFeature::from_words(["will blow your mind", "you"]);
        assert_eq!(score(&unit, "This will blow your mind, you see"), 2.0);
    }

    #[test]
    fn test_substring_mode() {
        let unit = ContainsWordsFeature::from_words(["."]).only_words(false);
        assert_eq!(score(&unit, "U.S. news..."), 5.0);

        let phrases =
            ContainsWordsFeature::from_words(["you won't believe"]).only_words(false);
        assert_eq!(score(&phrases, "YOU WON'T BELIEVE this"), 1.0);
    }

    #[test]
    fn test_binary() {
        let unit = ContainsWordsFeature::from_words(["e.g.", "etc."])
            .only_words(false)
            .binary(true);
        assert_eq!(score(&unit, "apples, pears etc. etc."), 1.0);
        assert_eq!(score(&unit, "nothing here"), 0.0);
    }

    #[test]
    fn test_text_list_input() {
        let unit = ContainsWordsFeature::from_words(["big"]);
        let value = FieldValue::TextList(vec!["big".into(), "big news".into()]);
        assert_eq!(
            unit.transform(&value).unwrap(),
            FeatureOutput::Scalar(2.0)
        );
    }

    #[test]
    fn test_rejects_non_text() {
        let unit = ContainsWordsFeature::from_words(["x"]);
        assert!(unit.transform(&FieldValue::Float(1.0)).is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Shocking\n\n  amazing  \nshocking").unwrap();

        let unit = ContainsWordsFeature::from_file(file.path()).unwrap();
        assert_eq!(unit.len(), 2);
        assert!(unit.source().ends_with(
            file.path()
                .file_name()
                .unwrap()
                .to_str()
                .unwrap()
        ));
        assert_eq!(score(&unit, "Amazing and shocking!"), 2.0);
    }

    #[test]
    fn test_missing_file() {
        assert!(ContainsWordsFeature::from_file("/definitely/not/here.txt").is_err());
    }
}
