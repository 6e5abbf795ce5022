//! Token types for text analysis.
//!
//! A [`Token`] is one unit of text produced by a tokenizer and rewritten by
//! filters. Feature units consume tokens to count words, build n-gram
//! vocabularies and score sentiment.
//!
//! # Examples
//!
//! ```
//! use clickbait::analysis::token::Token;
//!
//! let token = Token::with_offsets("world", 1, 6, 11);
//! assert_eq!(token.text, "world");
//! assert_eq!(token.start_offset, 6);
//! assert_eq!(token.char_len(), 5);
//! ```

/// A single token produced by the analysis pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token text.
    pub text: String,

    /// Position of the token in the stream.
    pub position: usize,

    /// Byte offset where the token starts in the source text.
    pub start_offset: usize,

    /// Byte offset where the token ends in the source text.
    pub end_offset: usize,
}

impl Token {
    /// Create a new token without offset information.
    pub fn new<S: Into<String>>(text: S, position: usize) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset: 0,
            end_offset: 0,
        }
    }

    /// Create a new token with text, position, and byte offsets.
    pub fn with_offsets<S: Into<String>>(
        text: S,
        position: usize,
        start_offset: usize,
        end_offset: usize,
    ) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset,
            end_offset,
        }
    }

    /// Number of characters (not bytes) in the token text.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Check if the token is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Clone this token with updated text.
    pub fn with_text<S: Into<String>>(&self, text: S) -> Self {
        let mut token = self.clone();
        token.text = text.into();
        token
    }
}

/// A stream of tokens.
pub type TokenStream = Box<dyn Iterator<Item = Token>>;

/// Collect the texts of a token stream.
pub fn texts(tokens: TokenStream) -> Vec<String> {
    tokens.map(|token| token.text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_creation() {
        let token = Token::new("hello", 3);
        assert_eq!(token.text, "hello");
        assert_eq!(token.position, 3);
        assert_eq!(token.start_offset, 0);
        assert!(!token.is_empty());
    }

    #[test]
    fn test_char_len_counts_characters() {
        let token = Token::new("café", 0);
        assert_eq!(token.char_len(), 4);
        assert_eq!(token.text.len(), 5);
    }

    #[test]
    fn test_with_text_keeps_offsets() {
        let token = Token::with_offsets("Hello", 0, 2, 7).with_text("hello");
        assert_eq!(token.text, "hello");
        assert_eq!(token.start_offset, 2);
        assert_eq!(token.end_offset, 7);
    }
}
