//! # clickbait
//!
//! Feature extraction and model training for clickbait detection on social
//! media posts.
//!
//! ## Features
//!
//! - Ordered, fit-once feature schemas over named record fields
//! - Lexicon, n-gram tf-idf, readability, sentiment and post metadata features
//! - A catalog of classifiers and regressors behind one `Estimator` trait
//! - Deterministic evaluation with classification and regression metrics
//! - Checksummed binary artifacts for schemas and trained models
//!
//! ## Example
//!
//! ```
//! use clickbait::feature::{CharacterSum, StartsWithNumber};
//! use clickbait::ml::ClickbaitModel;
//! use clickbait::record::Record;
//! use clickbait::schema::FeatureSchema;
//! use ndarray::array;
//!
//! let posts = ["10 tricks you need", "Parliament passes budget", "7 cats", "Rain expected"];
//! let records: Vec<Record> = posts
//!     .iter()
//!     .map(|text| Record::builder().add_text("postText", *text).build())
//!     .collect();
//!
//! let mut schema = FeatureSchema::new();
//! schema.add_feature(StartsWithNumber, "postText").unwrap();
//! schema.add_feature(CharacterSum, "postText").unwrap();
//! let features = schema.build(&records).unwrap();
//!
//! let mut trainer = ClickbaitModel::new();
//! trainer
//!     .regress(&features, &array![0.9, 0.1, 0.8, 0.2], "Ridge", false)
//!     .unwrap();
//! assert_eq!(trainer.predict(&features).unwrap().len(), 4);
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod feature;
pub mod matrix;
pub mod ml;
pub mod persist;
pub mod pipeline;
pub mod record;
pub mod schema;

pub mod prelude {
    pub use crate::config::{ClickbaitConfig, FeatureConfig, TrainerConfig};
    pub use crate::dataset::ClickbaitDataset;
    pub use crate::error::{ClickbaitError, Result};
    pub use crate::feature::{FeatureOutput, FeatureUnit};
    pub use crate::matrix::FeatureMatrix;
    pub use crate::ml::{ClickbaitModel, Estimator, EvaluationReport, ModelRegistry, Task};
    pub use crate::record::{FieldValue, Record};
    pub use crate::schema::FeatureSchema;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
