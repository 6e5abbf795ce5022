//! Error types for the clickbait pipeline.
//!
//! Every fallible operation in this crate returns [`Result`], whose error side
//! is the [`ClickbaitError`] enum. Lifecycle violations (transforming with an
//! unbuilt schema, predicting without a trained model) have their own variants
//! so callers can match on them instead of parsing messages.
//!
//! # Examples
//!
//! ```
//! use clickbait::error::{ClickbaitError, Result};
//!
//! fn check_width(width: usize) -> Result<()> {
//!     if width == 0 {
//!         return Err(ClickbaitError::data("feature matrix has no columns"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_width(0).is_err());
//! ```

use std::io;

use thiserror::Error;

/// The main error type for clickbait operations.
#[derive(Error, Debug)]
pub enum ClickbaitError {
    /// I/O errors (dataset files, word lists, artifacts)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid configuration or an illegal mutation, e.g. adding a feature after build
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A model name that is not in the catalog
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Missing or malformed input data
    #[error("Data error: {0}")]
    Data(String),

    /// Tokenizer or filter misconfiguration
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// The feature schema has not been built yet
    #[error("Schema not built: {0}")]
    SchemaNotBuilt(String),

    /// No model has been trained or loaded yet
    #[error("No trained model: {0}")]
    NoTrainedModel(String),

    /// A persisted artifact could not be decoded or disagrees with its header
    #[error("Corrupt state: {0}")]
    CorruptState(String),

    /// Binary encoding failure
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with ClickbaitError.
pub type Result<T> = std::result::Result<T, ClickbaitError>;

impl ClickbaitError {
    /// Create a new configuration error.
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        ClickbaitError::Configuration(msg.into())
    }

    /// Create a new unknown model error.
    pub fn unknown_model<S: Into<String>>(name: S) -> Self {
        ClickbaitError::UnknownModel(name.into())
    }

    /// Create a new data error.
    pub fn data<S: Into<String>>(msg: S) -> Self {
        ClickbaitError::Data(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        ClickbaitError::Analysis(msg.into())
    }

    /// Create a new schema-not-built error.
    pub fn schema_not_built<S: Into<String>>(msg: S) -> Self {
        ClickbaitError::SchemaNotBuilt(msg.into())
    }

    /// Create a new no-trained-model error.
    pub fn no_trained_model<S: Into<String>>(msg: S) -> Self {
        ClickbaitError::NoTrainedModel(msg.into())
    }

    /// Create a new corrupt state error.
    pub fn corrupt_state<S: Into<String>>(msg: S) -> Self {
        ClickbaitError::CorruptState(msg.into())
    }

    /// Create a new serialization error.
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        ClickbaitError::Serialization(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = ClickbaitError::configuration("schema already built");
        assert_eq!(
            error.to_string(),
            "Configuration error: schema already built"
        );

        let error = ClickbaitError::unknown_model("Perceptron");
        assert_eq!(error.to_string(), "Unknown model: Perceptron");

        let error = ClickbaitError::corrupt_state("bad magic");
        assert_eq!(error.to_string(), "Corrupt state: bad magic");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = ClickbaitError::from(io_error);

        match error {
            ClickbaitError::Io(_) => {}
            _ => panic!("Expected IO error variant"),
        }
    }
}
