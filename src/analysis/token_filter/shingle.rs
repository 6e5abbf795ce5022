//! Shingle filter: word n-grams over a token stream.

use crate::analysis::token::{Token, TokenStream};
use crate::analysis::token_filter::Filter;
use crate::error::{ClickbaitError, Result};

/// Joins runs of `min_size..=max_size` consecutive tokens with a single space.
///
/// Grams are emitted start position first, then by increasing size, the same
/// order [`NgramTokenizer`](crate::analysis::tokenizer::ngram::NgramTokenizer)
/// uses for characters.
///
/// # Examples
///
/// ```
/// use clickbait::analysis::token::Token;
/// use clickbait::analysis::token_filter::Filter;
/// use clickbait::analysis::token_filter::shingle::ShingleFilter;
///
/// let filter = ShingleFilter::new(1, 2).unwrap();
/// let tokens = vec![Token::new("big", 0), Token::new("news", 1)];
/// let grams: Vec<_> = filter.filter(Box::new(tokens.into_iter()))
///     .unwrap()
///     .map(|t| t.text)
///     .collect();
/// assert_eq!(grams, vec!["big", "big news", "news"]);
/// ```
#[derive(Clone, Debug)]
pub struct ShingleFilter {
    min_size: usize,
    max_size: usize,
}

impl ShingleFilter {
    /// Create a new shingle filter.
    pub fn new(min_size: usize, max_size: usize) -> Result<Self> {
        if min_size == 0 || max_size < min_size {
            return Err(ClickbaitError::analysis(format!(
                "invalid shingle range {min_size}..={max_size}"
            )));
        }
        Ok(ShingleFilter { min_size, max_size })
    }
}

impl Filter for ShingleFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let tokens: Vec<Token> = tokens.collect();
        let mut shingles = Vec::new();

        for start in 0..tokens.len() {
            for size in self.min_size..=self.max_size {
                let end = start + size;
                if end > tokens.len() {
                    break;
                }
                let window = &tokens[start..end];
                let text = window
                    .iter()
                    .map(|t| t.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                shingles.push(Token::with_offsets(
                    text,
                    shingles.len(),
                    window[0].start_offset,
                    window[size - 1].end_offset,
                ));
            }
        }

        Ok(Box::new(shingles.into_iter()))
    }

    fn name(&self) -> &'static str {
        "shingle"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(filter: &ShingleFilter, words: &[&str]) -> Vec<String> {
        let tokens: Vec<Token> = words
            .iter()
            .enumerate()
            .map(|(i, w)| Token::new(*w, i))
            .collect();
        filter
            .filter(Box::new(tokens.into_iter()))
            .unwrap()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_trigram_shingles() {
        let filter = ShingleFilter::new(1, 3).unwrap();
        let grams = run(&filter, &["you", "will", "cry"]);
        assert_eq!(
            grams,
            vec!["you", "you will", "you will cry", "will", "will cry", "cry"]
        );
    }

    #[test]
    fn test_only_bigrams() {
        let filter = ShingleFilter::new(2, 2).unwrap();
        assert_eq!(run(&filter, &["a", "b", "c"]), vec!["a b", "b c"]);
        assert!(run(&filter, &["a"]).is_empty());
    }

    #[test]
    fn test_invalid_range() {
        assert!(ShingleFilter::new(0, 2).is_err());
        assert!(ShingleFilter::new(3, 2).is_err());
    }
}
