//! Token filters that rewrite token streams.
//!
//! - [`lowercase::LowercaseFilter`] lower-cases every token
//! - [`shingle::ShingleFilter`] joins consecutive tokens into word n-grams
//!
//! Filters are chained inside a
//! [`PipelineAnalyzer`](crate::analysis::analyzer::pipeline::PipelineAnalyzer):
//!
//! ```text
//! Tokenizer → Lowercase → Shingle → feature unit
//! ```

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for filters that transform token streams.
pub trait Filter: Send + Sync {
    /// Apply this filter to a token stream.
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream>;

    /// Get the name of this filter.
    fn name(&self) -> &'static str;
}

pub mod lowercase;
pub mod shingle;
