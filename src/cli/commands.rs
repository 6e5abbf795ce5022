//! Command implementations for the clickbait CLI.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use serde_json::json;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::ClickbaitConfig;
use crate::dataset::ClickbaitDataset;
use crate::matrix::FeatureMatrix;
use crate::ml::{ClickbaitModel, EvaluationReport, Model, ModelRegistry, ModelSelector, Ridge};
use crate::pipeline::clickbait_schema;
use crate::schema::FeatureSchema;

/// Execute a CLI command.
pub fn execute_command(args: ClickbaitArgs) -> Result<()> {
    let config = load_config(&args)?;
    match &args.command {
        Command::Train(train_args) => train(train_args, &config, &args),
        Command::Evaluate(evaluate_args) => evaluate(evaluate_args, &config, &args),
        Command::Predict(predict_args) => predict(predict_args, &args),
        Command::Models => list_models(&args),
    }
}

fn load_config(args: &ClickbaitArgs) -> Result<ClickbaitConfig> {
    match &args.config {
        Some(path) => ClickbaitConfig::from_file(path)
            .with_context(|| format!("failed to read configuration {}", path.display())),
        None => Ok(ClickbaitConfig::default()),
    }
}

/// `--alpha` only parameterizes Ridge; every other name goes through the catalog.
fn model_selector(name: &str, alpha: f64) -> ModelSelector {
    if name == "Ridge" {
        ModelSelector::Instance(Model::Ridge(Ridge::new(alpha)))
    } else {
        ModelSelector::from(name)
    }
}

/// Load a labelled dataset and build the clickbait features on it.
fn build_features(
    dataset_dir: &Path,
    config: &ClickbaitConfig,
) -> Result<(ClickbaitDataset, FeatureSchema, FeatureMatrix)> {
    let dataset = ClickbaitDataset::from_dir(dataset_dir)
        .with_context(|| format!("failed to load dataset from {}", dataset_dir.display()))?;
    log::info!("loaded {} records", dataset.len());

    let mut schema = clickbait_schema(&config.features).with_context(|| {
        format!(
            "failed to assemble features from word lists in {}",
            config.features.wordlist_dir.display()
        )
    })?;
    let matrix = schema
        .build(dataset.records())
        .context("failed to build the feature schema")?;
    Ok((dataset, schema, matrix))
}

fn fit(
    trainer: &mut ClickbaitModel,
    task: TaskArg,
    dataset: &ClickbaitDataset,
    matrix: &FeatureMatrix,
    selector: ModelSelector,
    evaluate: bool,
) -> Result<Option<EvaluationReport>> {
    let report = match task {
        TaskArg::Regress => trainer.regress(matrix, &dataset.get_y()?, selector, evaluate)?,
        TaskArg::Classify => trainer.classify(matrix, &dataset.get_y_class()?, selector, evaluate)?,
    };
    Ok(report)
}

/// Build features, train and persist both artifacts.
fn train(args: &TrainArgs, config: &ClickbaitConfig, cli_args: &ClickbaitArgs) -> Result<()> {
    let start_time = Instant::now();
    let (dataset, schema, matrix) = build_features(&args.dataset_dir, config)?;

    let mut trainer = ClickbaitModel::new().with_config(config.trainer.clone());
    let report = fit(
        &mut trainer,
        args.task,
        &dataset,
        &matrix,
        model_selector(&args.model, args.alpha),
        args.evaluate,
    )
    .with_context(|| format!("failed to train {}", args.model))?;

    schema
        .save(&args.schema_out)
        .with_context(|| format!("failed to write schema to {}", args.schema_out.display()))?;
    trainer
        .save(&args.model_out)
        .with_context(|| format!("failed to write model to {}", args.model_out.display()))?;

    let trained = trainer
        .trained()
        .context("training finished without a model")?;
    output_result(
        "Model trained successfully",
        &TrainingResult {
            records: dataset.len(),
            features: matrix.ncols(),
            model: trained.family().to_string(),
            task: trained.task(),
            schema_path: display_path(&args.schema_out),
            model_path: display_path(&args.model_out),
            duration_ms: start_time.elapsed().as_millis() as u64,
            evaluation: report,
        },
        cli_args,
    )?;
    Ok(())
}

/// Train on a split and report held-out metrics. Nothing is written.
fn evaluate(
    args: &EvaluateArgs,
    config: &ClickbaitConfig,
    cli_args: &ClickbaitArgs,
) -> Result<()> {
    let (dataset, _schema, matrix) = build_features(&args.dataset_dir, config)?;

    let mut trainer = ClickbaitModel::new().with_config(config.trainer.clone());
    let Some(report) = fit(
        &mut trainer,
        args.task,
        &dataset,
        &matrix,
        model_selector(&args.model, args.alpha),
        true,
    )
    .with_context(|| format!("failed to evaluate {}", args.model))?
    else {
        bail!("evaluation produced no report");
    };

    output_result("Evaluation report", &report, cli_args)?;
    Ok(())
}

/// Score every instance and write one JSON line per record.
fn predict(args: &PredictArgs, cli_args: &ClickbaitArgs) -> Result<()> {
    let start_time = Instant::now();
    let schema = FeatureSchema::load(&args.schema)
        .with_context(|| format!("failed to load schema {}", args.schema.display()))?;
    let mut trainer = ClickbaitModel::new();
    trainer
        .load(&args.model)
        .with_context(|| format!("failed to load model {}", args.model.display()))?;

    let dataset = ClickbaitDataset::open(&args.instances, None)
        .with_context(|| format!("failed to read instances {}", args.instances.display()))?;
    let matrix = schema
        .transform(dataset.records())
        .context("failed to compute features")?;
    let scores = trainer.scores(&matrix)?;

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("failed to create output file {}", path.display())
        })?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    for (id, score) in dataset.ids().iter().zip(scores.iter()) {
        let line = json!({ "id": id, "clickbaitScore": score.clamp(0.0, 1.0) });
        writeln!(writer, "{line}")?;
    }
    writer.flush()?;

    let model = trainer
        .trained()
        .map(|t| t.family().to_string())
        .unwrap_or_default();
    log::info!("scored {} records with {model}", dataset.len());

    // predictions on stdout are the output; only report when writing to a file
    if let Some(path) = &args.output {
        output_result(
            "Predictions written",
            &PredictionResult {
                records: dataset.len(),
                model,
                output: display_path(path),
                duration_ms: start_time.elapsed().as_millis() as u64,
            },
            cli_args,
        )?;
    }
    Ok(())
}

/// List the catalog with each family's task.
fn list_models(cli_args: &ClickbaitArgs) -> Result<()> {
    let registry = ModelRegistry::default();
    let entries: Vec<ModelEntry> = registry
        .entries()
        .into_iter()
        .map(|(name, task)| ModelEntry {
            name: name.to_string(),
            task,
        })
        .collect();
    output_result("Available models", &entries, cli_args)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_selector() {
        match model_selector("Ridge", 3.5) {
            ModelSelector::Instance(Model::Ridge(ridge)) => assert_eq!(ridge.alpha, 3.5),
            other => panic!("unexpected selector {other:?}"),
        }
        assert!(matches!(
            model_selector("Lasso", 3.5),
            ModelSelector::Name(name) if name == "Lasso"
        ));
    }

    #[test]
    fn test_missing_config_file() {
        let args = ClickbaitArgs {
            verbose: 0,
            quiet: true,
            output_format: OutputFormat::Json,
            pretty: false,
            config: Some("/nonexistent/clickbait.json".into()),
            command: Command::Models,
        };
        let error = execute_command(args).unwrap_err();
        assert!(error.to_string().contains("failed to read configuration"));
    }
}
