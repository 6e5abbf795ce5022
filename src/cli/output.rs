//! Output formatting for CLI commands.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cli::args::{ClickbaitArgs, OutputFormat};
use crate::error::Result;
use crate::ml::{EvaluationReport, Task};

/// Result structure for a training run.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainingResult {
    pub records: usize,
    pub features: usize,
    pub model: String,
    pub task: Task,
    pub schema_path: String,
    pub model_path: String,
    pub duration_ms: u64,
    pub evaluation: Option<EvaluationReport>,
}

/// Result structure for a prediction run.
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResult {
    pub records: usize,
    pub model: String,
    pub output: String,
    pub duration_ms: u64,
}

/// One catalog entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    pub task: Task,
}

pub(crate) fn display_path(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &ClickbaitArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: Serialize>(message: &str, result: &T, args: &ClickbaitArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }

    let value = serde_json::to_value(result)?;
    for line in human_lines(&value, 0) {
        println!("{line}");
    }
    Ok(())
}

/// Render a JSON value as indented `key: value` lines.
///
/// Metric lists (arrays of `[name, value]` pairs) become one `name: value`
/// line per metric; arrays of objects become one line per object.
fn human_lines(value: &serde_json::Value, indent: usize) -> Vec<String> {
    let spaces = "  ".repeat(indent);
    let mut lines = Vec::new();

    match value {
        serde_json::Value::Object(obj) => {
            for (key, val) in obj {
                match val {
                    serde_json::Value::Object(_) => {
                        lines.push(format!("{spaces}{key}:"));
                        lines.extend(human_lines(val, indent + 1));
                    }
                    serde_json::Value::Array(arr) if !arr.is_empty() => {
                        lines.push(format!("{spaces}{key}:"));
                        lines.extend(human_lines(val, indent + 1));
                    }
                    _ => lines.push(format!("{spaces}{key}: {}", format_value(val))),
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for item in arr {
                match item {
                    serde_json::Value::Array(pair) if pair.len() == 2 && pair[0].is_string() => {
                        lines.push(format!(
                            "{spaces}{}: {}",
                            format_value(&pair[0]),
                            format_value(&pair[1])
                        ));
                    }
                    serde_json::Value::Object(obj) => {
                        let fields: Vec<String> = obj.values().map(format_value).collect();
                        lines.push(format!("{spaces}{}", fields.join("  ")));
                    }
                    _ => lines.push(format!("{spaces}{}", format_value(item))),
                }
            }
        }
        _ => lines.push(format!("{spaces}{}", format_value(value))),
    }
    lines
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &ClickbaitArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

/// Format a scalar JSON value for display.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if !n.is_i64() && !n.is_u64() => format!("{f:.4}"),
            _ => n.to_string(),
        },
        serde_json::Value::Bool(b) => b.to_string(),
        // NaN metrics serialize as null
        serde_json::Value::Null => "n/a".to_string(),
        serde_json::Value::Array(arr) => format!("[{} items]", arr.len()),
        serde_json::Value::Object(obj) => format!("{{{} fields}}", obj.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&json!("Ridge")), "Ridge");
        assert_eq!(format_value(&json!(42)), "42");
        assert_eq!(format_value(&json!(0.123456)), "0.1235");
        assert_eq!(format_value(&json!(false)), "false");
        assert_eq!(format_value(&serde_json::Value::Null), "n/a");
    }

    #[test]
    fn test_metric_lines() {
        let report = EvaluationReport {
            task: Task::Classification,
            family: "LogisticRegression".to_string(),
            n_train: 7,
            n_test: 3,
            metrics: vec![("Accuracy".to_string(), 1.0), ("ROC-AUC".to_string(), f64::NAN)],
        };
        let lines = human_lines(&serde_json::to_value(&report).unwrap(), 0);

        assert!(lines.contains(&"family: LogisticRegression".to_string()));
        assert!(lines.contains(&"metrics:".to_string()));
        assert!(lines.contains(&"  Accuracy: 1.0000".to_string()));
        assert!(lines.contains(&"  ROC-AUC: n/a".to_string()));
    }

    #[test]
    fn test_model_entries() {
        let entries = vec![ModelEntry {
            name: "Ridge".to_string(),
            task: Task::Regression,
        }];
        let lines = human_lines(&serde_json::to_value(&entries).unwrap(), 0);
        assert_eq!(lines, vec!["Ridge  Regression".to_string()]);
    }
}
