//! Configuration of the feature set and the trainer.
//!
//! Every section has complete defaults, so a configuration file only needs
//! the keys it changes:
//!
//! ```json
//! { "features": { "ngram_cutoff": 5, "article_features": false } }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ClickbaitError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickbaitConfig {
    /// Evaluation split settings.
    pub trainer: TrainerConfig,
    /// Which features the clickbait schema contains.
    pub features: FeatureConfig,
}

impl ClickbaitConfig {
    /// Read and validate a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config: ClickbaitConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.trainer.validate()?;
        self.features.validate()
    }
}

/// Train/test split used when a training run is evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Fraction of samples held out, in (0, 1).
    pub test_size: f64,
    /// Seed of the split shuffle.
    pub random_state: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            test_size: 0.25,
            random_state: 42,
        }
    }
}

impl TrainerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(ClickbaitError::configuration(format!(
                "trainer.test_size must lie strictly between 0 and 1, got {}",
                self.test_size
            )));
        }
        Ok(())
    }
}

/// Feature set options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Directory holding the word lists.
    pub wordlist_dir: PathBuf,
    /// Highest n-gram order of the word and character n-gram units.
    pub ngram_order: usize,
    /// Minimum document frequency of an n-gram.
    pub ngram_cutoff: usize,
    /// Add one unit per list in `<wordlist_dir>/general-inquirer`.
    pub general_inquirer: bool,
    /// Add features of the linked article's paragraphs.
    pub article_features: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            wordlist_dir: PathBuf::from("wordlists"),
            ngram_order: 3,
            ngram_cutoff: 3,
            general_inquirer: true,
            article_features: true,
        }
    }
}

impl FeatureConfig {
    pub fn validate(&self) -> Result<()> {
        if self.ngram_order == 0 {
            return Err(ClickbaitError::configuration(
                "features.ngram_order must be at least 1",
            ));
        }
        if self.ngram_cutoff == 0 {
            return Err(ClickbaitError::configuration(
                "features.ngram_cutoff must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ClickbaitConfig::default();
        assert_eq!(config.trainer.test_size, 0.25);
        assert_eq!(config.trainer.random_state, 42);
        assert_eq!(config.features.wordlist_dir, PathBuf::from("wordlists"));
        assert_eq!(config.features.ngram_order, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"features": {{"ngram_cutoff": 5, "article_features": false}}}}"#
        )
        .unwrap();

        let config = ClickbaitConfig::from_file(file.path()).unwrap();
        assert_eq!(config.features.ngram_cutoff, 5);
        assert!(!config.features.article_features);
        assert_eq!(config.features.ngram_order, 3);
        assert_eq!(config.trainer, TrainerConfig::default());
    }

    #[test]
    fn test_invalid_values() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"trainer": {{"test_size": 1.5}}}}"#).unwrap();
        assert!(matches!(
            ClickbaitConfig::from_file(file.path()),
            Err(ClickbaitError::Configuration(_))
        ));

        let features = FeatureConfig {
            ngram_order: 0,
            ..FeatureConfig::default()
        };
        assert!(features.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        assert!(matches!(
            ClickbaitConfig::from_file(file.path()),
            Err(ClickbaitError::Json(_))
        ));
    }
}
