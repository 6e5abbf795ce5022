//! Command line argument parsing for the clickbait CLI using clap.

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// clickbait - train and apply clickbait detectors on social media posts
#[derive(Parser, Debug, Clone)]
#[command(name = "clickbait")]
#[command(about = "Feature extraction and model training for clickbait detection")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct ClickbaitArgs {
    /// Verbosity level (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Configuration file (JSON)
    #[arg(long, value_name = "FILE", env = "CLICKBAIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl ClickbaitArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose.saturating_add(1)
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build features, train a model and save both artifacts
    Train(TrainArgs),

    /// Train on a split of the dataset and report held-out metrics
    Evaluate(EvaluateArgs),

    /// Score instances with a saved schema and model
    Predict(PredictArgs),

    /// List the model catalog
    Models,
}

/// Learning task of a training run
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskArg {
    /// Regress the mean truth judgement
    Regress,
    /// Classify into clickbait / no-clickbait
    Classify,
}

/// Arguments for training
#[derive(Parser, Debug, Clone)]
pub struct TrainArgs {
    /// Directory containing instances.jsonl and truth.jsonl
    #[arg(value_name = "DATASET_DIR")]
    pub dataset_dir: PathBuf,

    /// Where to write the feature schema
    #[arg(long, default_value = "feature_schema.bin")]
    pub schema_out: PathBuf,

    /// Where to write the trained model
    #[arg(long, default_value = "model_trained.bin")]
    pub model_out: PathBuf,

    /// Catalog name of the model
    #[arg(short, long, default_value = "Ridge")]
    pub model: String,

    /// Regularization strength, used when the model is Ridge
    #[arg(long, default_value = "3.5")]
    pub alpha: f64,

    /// Learning task
    #[arg(long, default_value = "regress")]
    pub task: TaskArg,

    /// Also report metrics on a held-out split (the saved model is then
    /// fitted on the training split only)
    #[arg(long)]
    pub evaluate: bool,
}

/// Arguments for evaluation
#[derive(Parser, Debug, Clone)]
pub struct EvaluateArgs {
    /// Directory containing instances.jsonl and truth.jsonl
    #[arg(value_name = "DATASET_DIR")]
    pub dataset_dir: PathBuf,

    /// Catalog name of the model
    #[arg(short, long, default_value = "Ridge")]
    pub model: String,

    /// Regularization strength, used when the model is Ridge
    #[arg(long, default_value = "3.5")]
    pub alpha: f64,

    /// Learning task
    #[arg(long, default_value = "regress")]
    pub task: TaskArg,
}

/// Arguments for prediction
#[derive(Parser, Debug, Clone)]
pub struct PredictArgs {
    /// Instances file (JSONL)
    #[arg(value_name = "INSTANCES")]
    pub instances: PathBuf,

    /// Feature schema written by `train`
    #[arg(long, default_value = "feature_schema.bin")]
    pub schema: PathBuf,

    /// Model written by `train`
    #[arg(long, default_value = "model_trained.bin")]
    pub model: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        let args = ClickbaitArgs::try_parse_from(["clickbait", "models"]).unwrap();
        assert_eq!(args.verbosity(), 1);

        let args = ClickbaitArgs::try_parse_from(["clickbait", "-vv", "models"]).unwrap();
        assert_eq!(args.verbosity(), 3);

        let args = ClickbaitArgs::try_parse_from(["clickbait", "-v", "--quiet", "models"]).unwrap();
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_train_defaults() {
        let args = ClickbaitArgs::try_parse_from(["clickbait", "train", "data/"]).unwrap();
        let Command::Train(train) = args.command else {
            panic!("Expected Train command");
        };
        assert_eq!(train.model, "Ridge");
        assert_eq!(train.alpha, 3.5);
        assert_eq!(train.task, TaskArg::Regress);
        assert_eq!(train.schema_out, PathBuf::from("feature_schema.bin"));
        assert_eq!(train.model_out, PathBuf::from("model_trained.bin"));
        assert!(!train.evaluate);
    }

    #[test]
    fn test_evaluate_options() {
        let args = ClickbaitArgs::try_parse_from([
            "clickbait",
            "--format",
            "json",
            "evaluate",
            "data/",
            "--model",
            "LogisticRegression",
            "--task",
            "classify",
        ])
        .unwrap();
        assert!(matches!(args.output_format, OutputFormat::Json));
        let Command::Evaluate(evaluate) = args.command else {
            panic!("Expected Evaluate command");
        };
        assert_eq!(evaluate.model, "LogisticRegression");
        assert_eq!(evaluate.task, TaskArg::Classify);
    }

    #[test]
    fn test_usage_errors() {
        assert!(ClickbaitArgs::try_parse_from(["clickbait"]).is_err());
        assert!(ClickbaitArgs::try_parse_from(["clickbait", "train"]).is_err());
        assert!(
            ClickbaitArgs::try_parse_from(["clickbait", "train", "d", "--task", "cluster"])
                .is_err()
        );
    }
}
