//! Tokenizers that split text into tokens.
//!
//! - [`unicode_word::UnicodeWordTokenizer`] splits on Unicode word boundaries
//! - [`ngram::NgramTokenizer`] emits overlapping character n-grams

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for tokenizers that convert text into tokens.
///
/// The trait requires `Send + Sync` so tokenizers can be shared by feature
/// units that live inside a schema.
pub trait Tokenizer: Send + Sync {
    /// Tokenize the given text into a stream of tokens.
    fn tokenize(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this tokenizer.
    fn name(&self) -> &'static str;
}

pub mod ngram;
pub mod unicode_word;
