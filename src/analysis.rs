//! Text analysis for the feature units.
//!
//! Tokenizers split raw text, filters rewrite the token stream, and analyzers
//! tie the two together. Feature units never tokenize text themselves; they go
//! through one of the pipelines in [`analyzer::pipeline`].

pub mod analyzer;
pub mod token;
pub mod token_filter;
pub mod tokenizer;
