//! Pipeline analyzer that combines a tokenizer and filters.
//!
//! The feature units only need three pipelines, each with a shortcut
//! constructor:
//!
//! - [`PipelineAnalyzer::words`]: Unicode words, lower-cased
//! - [`PipelineAnalyzer::word_ngrams`]: lower-cased word n-grams of orders `1..=n`
//! - [`PipelineAnalyzer::char_ngrams`]: lower-cased character n-grams of orders `1..=n`
//!
//! # Examples
//!
//! ```
//! use clickbait::analysis::analyzer::Analyzer;
//! use clickbait::analysis::analyzer::pipeline::PipelineAnalyzer;
//!
//! let analyzer = PipelineAnalyzer::words();
//! let tokens: Vec<_> = analyzer.analyze("This Is NEWS").unwrap().map(|t| t.text).collect();
//! assert_eq!(tokens, vec!["this", "is", "news"]);
//! ```

use std::sync::Arc;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::Filter;
use crate::analysis::token_filter::lowercase::LowercaseFilter;
use crate::analysis::token_filter::shingle::ShingleFilter;
use crate::analysis::tokenizer::Tokenizer;
use crate::analysis::tokenizer::ngram::NgramTokenizer;
use crate::analysis::tokenizer::unicode_word::UnicodeWordTokenizer;
use crate::error::Result;

/// A configurable analyzer that combines a tokenizer with a chain of filters.
#[derive(Clone)]
pub struct PipelineAnalyzer {
    tokenizer: Arc<dyn Tokenizer>,
    filters: Vec<Arc<dyn Filter>>,
}

impl PipelineAnalyzer {
    /// Create a new pipeline analyzer with the given tokenizer.
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        PipelineAnalyzer {
            tokenizer,
            filters: Vec::new(),
        }
    }

    /// Add a filter to the pipeline.
    pub fn add_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Lower-cased Unicode words.
    pub fn words() -> Self {
        PipelineAnalyzer::new(Arc::new(UnicodeWordTokenizer::new()))
            .add_filter(Arc::new(LowercaseFilter::new()))
    }

    /// Lower-cased word n-grams of every order from 1 to `order`.
    pub fn word_ngrams(order: usize) -> Result<Self> {
        Ok(PipelineAnalyzer::words().add_filter(Arc::new(ShingleFilter::new(1, order)?)))
    }

    /// Lower-cased character n-grams of every order from 1 to `order`.
    pub fn char_ngrams(order: usize) -> Result<Self> {
        Ok(
            PipelineAnalyzer::new(Arc::new(NgramTokenizer::new(1, order)?))
                .add_filter(Arc::new(LowercaseFilter::new())),
        )
    }

    /// Get the tokenizer used by this analyzer.
    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }

    /// Get the filters used by this analyzer.
    pub fn filters(&self) -> &[Arc<dyn Filter>] {
        &self.filters
    }
}

impl Analyzer for PipelineAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        let mut tokens = self.tokenizer.tokenize(text)?;

        for filter in &self.filters {
            tokens = filter.filter(tokens)?;
        }

        Ok(tokens)
    }

    fn name(&self) -> &'static str {
        "pipeline"
    }
}
