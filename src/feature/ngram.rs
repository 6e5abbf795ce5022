//! TF-IDF weighted word or character n-grams.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::pipeline::PipelineAnalyzer;
use crate::analysis::token::texts;
use crate::error::{ClickbaitError, Result};
use crate::feature::text::text_of;
use crate::feature::{FeatureOutput, FeatureUnit, SparseVector};
use crate::persist;
use crate::record::FieldValue;

/// What an n-gram is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NGramAnalyzer {
    /// Consecutive lower-cased word tokens joined with a space.
    #[default]
    Word,
    /// Consecutive characters of the lower-cased text, whitespace included.
    Char,
}

/// Analyzer built on first use and shared by every later call. It is not
/// persisted; a loaded unit rebuilds it from `analyzer` and `order`.
#[derive(Clone, Default)]
struct CachedPipeline(OnceLock<PipelineAnalyzer>);

impl fmt::Debug for CachedPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.0.get().is_some() { "built" } else { "unbuilt" })
    }
}

// derived from the other fields
impl PartialEq for CachedPipeline {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// Sparse tf-idf vector over every n-gram of order `1..=order`.
///
/// Fitting collects the document frequency of each gram across the corpus and
/// keeps grams seen in at least `cutoff` documents. The vocabulary is sorted,
/// so the column of a gram only depends on the fit corpus, never on its order.
/// Rows are L2-normalised.
///
/// idf(t) = ln((1 + N) / (1 + df(t))) + 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NGramFeature {
    analyzer: NGramAnalyzer,
    order: usize,
    cutoff: usize,
    vocabulary: Vec<String>,
    idf: Vec<f64>,
    fitted: bool,
    #[serde(skip)]
    pipeline: CachedPipeline,
}

impl NGramFeature {
    /// Create an unfitted unit. `order` and `cutoff` must be at least 1.
    pub fn new(analyzer: NGramAnalyzer, order: usize, cutoff: usize) -> Result<Self> {
        if order == 0 {
            return Err(ClickbaitError::configuration("n-gram order must be at least 1"));
        }
        if cutoff == 0 {
            return Err(ClickbaitError::configuration(
                "n-gram cutoff must be at least 1",
            ));
        }
        Ok(NGramFeature {
            analyzer,
            order,
            cutoff,
            vocabulary: Vec::new(),
            idf: Vec::new(),
            fitted: false,
            pipeline: CachedPipeline::default(),
        })
    }

    /// Word n-grams up to `order` with a cutoff of 1.
    pub fn word(order: usize) -> Result<Self> {
        Self::new(NGramAnalyzer::Word, order, 1)
    }

    /// Character n-grams up to `order` with a cutoff of 1.
    pub fn char(order: usize) -> Result<Self> {
        Self::new(NGramAnalyzer::Char, order, 1)
    }

    /// Minimum number of documents a gram must occur in.
    pub fn with_cutoff(mut self, cutoff: usize) -> Result<Self> {
        if cutoff == 0 {
            return Err(ClickbaitError::configuration(
                "n-gram cutoff must be at least 1",
            ));
        }
        self.cutoff = cutoff;
        Ok(self)
    }

    pub fn analyzer(&self) -> NGramAnalyzer {
        self.analyzer
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    fn pipeline(&self) -> Result<&PipelineAnalyzer> {
        if let Some(pipeline) = self.pipeline.0.get() {
            return Ok(pipeline);
        }
        let built = match self.analyzer {
            NGramAnalyzer::Word => PipelineAnalyzer::word_ngrams(self.order)?,
            NGramAnalyzer::Char => PipelineAnalyzer::char_ngrams(self.order)?,
        };
        Ok(self.pipeline.0.get_or_init(|| built))
    }

    fn grams(&self, text: &str) -> Result<Vec<String>> {
        Ok(texts(self.pipeline()?.analyze(text)?))
    }
}

impl FeatureUnit for NGramFeature {
    fn kind(&self) -> &'static str {
        "ngram"
    }

    fn requires_fit(&self) -> bool {
        true
    }

    fn fit(&mut self, values: &[&FieldValue]) -> Result<()> {
        if values.is_empty() {
            return Err(ClickbaitError::data("cannot fit n-grams on an empty corpus"));
        }

        let mut document_frequency: AHashMap<String, usize> = AHashMap::new();
        for value in values {
            let text = text_of("ngram", value)?;
            let unique: AHashSet<String> = self.grams(&text)?.into_iter().collect();
            for gram in unique {
                *document_frequency.entry(gram).or_insert(0) += 1;
            }
        }

        let n_documents = values.len() as f64;
        let kept: BTreeMap<String, usize> = document_frequency
            .into_iter()
            .filter(|(_, df)| *df >= self.cutoff)
            .collect();

        self.idf = kept
            .values()
            .map(|df| ((n_documents + 1.0) / (*df as f64 + 1.0)).ln() + 1.0)
            .collect();
        self.vocabulary = kept.into_keys().collect();
        self.fitted = true;

        log::debug!(
            "fitted {:?} n-grams (order {}, cutoff {}): {} terms from {} documents",
            self.analyzer,
            self.order,
            self.cutoff,
            self.vocabulary.len(),
            values.len()
        );
        Ok(())
    }

    fn width(&self) -> Option<usize> {
        self.fitted.then_some(self.vocabulary.len())
    }

    fn transform(&self, value: &FieldValue) -> Result<FeatureOutput> {
        if !self.fitted {
            return Err(ClickbaitError::configuration(
                "n-gram feature used before it was fitted",
            ));
        }
        let text = text_of("ngram", value)?;

        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for gram in self.grams(&text)? {
            if let Ok(index) = self.vocabulary.binary_search(&gram) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let mut entries: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(index, tf)| (index, tf * self.idf[index]))
            .collect();
        let norm = entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in &mut entries {
                *v /= norm;
            }
        }

        Ok(FeatureOutput::Sparse(SparseVector::new(
            self.vocabulary.len(),
            entries,
        )?))
    }

    fn box_clone(&self) -> Box<dyn FeatureUnit> {
        Box::new(self.clone())
    }

    fn save_state(&self) -> Result<Vec<u8>> {
        persist::encode(self)
    }
}
