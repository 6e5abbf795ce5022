//! Character n-gram tokenizer.

use crate::analysis::token::{Token, TokenStream};
use crate::analysis::tokenizer::Tokenizer;
use crate::error::{ClickbaitError, Result};

/// A tokenizer that generates overlapping character n-grams.
///
/// Whitespace and punctuation are part of the grams, so "a b" yields the
/// trigram "a b". This is what char-level n-gram features expect.
///
/// # Examples
///
/// ```
/// use clickbait::analysis::tokenizer::ngram::NgramTokenizer;
/// use clickbait::analysis::tokenizer::Tokenizer;
///
/// let tokenizer = NgramTokenizer::new(2, 3).unwrap();
/// let tokens: Vec<_> = tokenizer.tokenize("abc").unwrap()
///     .map(|t| t.text)
///     .collect();
/// assert_eq!(tokens, vec!["ab", "abc", "bc"]);
/// ```
#[derive(Clone, Debug)]
pub struct NgramTokenizer {
    min_gram: usize,
    max_gram: usize,
}

impl NgramTokenizer {
    /// Create a new n-gram tokenizer.
    ///
    /// # Errors
    ///
    /// Returns an analysis error if `min_gram` is 0 or `max_gram < min_gram`.
    pub fn new(min_gram: usize, max_gram: usize) -> Result<Self> {
        if min_gram == 0 {
            return Err(ClickbaitError::analysis("min_gram must be at least 1"));
        }
        if max_gram < min_gram {
            return Err(ClickbaitError::analysis(format!(
                "max_gram ({max_gram}) must be >= min_gram ({min_gram})"
            )));
        }
        Ok(Self { min_gram, max_gram })
    }

    /// Create a trigram tokenizer (n=3).
    pub fn trigram() -> Self {
        Self {
            min_gram: 3,
            max_gram: 3,
        }
    }
}

impl Tokenizer for NgramTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenStream> {
        // Byte offset of every char boundary, including the end of the text.
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        boundaries.push(text.len());
        let n_chars = boundaries.len() - 1;

        let mut tokens = Vec::new();
        let mut position = 0;

        for start in 0..n_chars {
            for gram_size in self.min_gram..=self.max_gram {
                let end = start + gram_size;
                if end > n_chars {
                    break;
                }
                let (start_offset, end_offset) = (boundaries[start], boundaries[end]);
                tokens.push(Token::with_offsets(
                    &text[start_offset..end_offset],
                    position,
                    start_offset,
                    end_offset,
                ));
                position += 1;
            }
        }

        Ok(Box::new(tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        "ngram"
    }
}
