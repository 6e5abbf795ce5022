//! Loader for the Webis Clickbait Corpus 2017 layout.
//!
//! A corpus directory holds two JSON Lines files:
//!
//! - `instances.jsonl`: one post per line (`id`, `postText`, `postMedia`,
//!   `postTimestamp`, `targetParagraphs`, ...)
//! - `truth.jsonl`: annotations keyed by `id` (`truthMean`, `truthClass`, ...)
//!
//! The truth file is optional so the same loader serves unlabelled test
//! corpora at prediction time.
//!
//! ```no_run
//! use clickbait::dataset::ClickbaitDataset;
//!
//! let dataset = ClickbaitDataset::from_dir("clickbait17-validation-170630").unwrap();
//! let post_texts = dataset.get_x("postText").unwrap();
//! let scores = dataset.get_y().unwrap();
//! assert_eq!(post_texts.len(), scores.len());
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{DateTime, Utc};
use ndarray::Array1;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ClickbaitError, Result};
use crate::record::{FieldValue, Record};

/// File name of the instance file inside a corpus directory.
pub const INSTANCES_FILE: &str = "instances.jsonl";

/// File name of the truth file inside a corpus directory.
pub const TRUTH_FILE: &str = "truth.jsonl";

/// Timestamp layout used by the corpus, e.g. `Thu Jun 08 12:10:44 +0000 2017`.
const TIMESTAMP_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Ground-truth annotation of one instance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Truth {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub truth_judgments: Vec<f64>,
    pub truth_mean: f64,
    #[serde(default)]
    pub truth_median: Option<f64>,
    #[serde(default)]
    pub truth_mode: Option<f64>,
    pub truth_class: String,
}

impl Truth {
    pub fn is_clickbait(&self) -> bool {
        self.truth_class == "clickbait"
    }
}

/// Ids appear both as JSON strings and as bare numbers across corpus releases.
fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid id: {other}"))),
    }
}

/// An in-memory corpus: records in file order plus optional aligned truth.
#[derive(Debug, Clone)]
pub struct ClickbaitDataset {
    ids: Vec<String>,
    records: Vec<Record>,
    truth: Option<Vec<Truth>>,
}

impl ClickbaitDataset {
    /// Load a corpus from an instance file and an optional truth file.
    pub fn open<P: AsRef<Path>>(instances: P, truth: Option<&Path>) -> Result<Self> {
        let instances = instances.as_ref();
        let (ids, records) = parse_instances(BufReader::new(File::open(instances)?))?;
        log::info!(
            "loaded {} instances from {}",
            records.len(),
            instances.display()
        );

        let truth = match truth {
            Some(path) => {
                let by_id = parse_truth(BufReader::new(File::open(path)?))?;
                Some(align_truth(&ids, by_id)?)
            }
            None => None,
        };

        Ok(ClickbaitDataset {
            ids,
            records,
            truth,
        })
    }

    /// Load `instances.jsonl` and, when present, `truth.jsonl` from a directory.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let truth_path = dir.join(TRUTH_FILE);
        let truth = truth_path.is_file().then_some(truth_path.as_path());
        Self::open(dir.join(INSTANCES_FILE), truth)
    }

    /// Build a dataset from already-parsed parts.
    pub fn from_parts(
        ids: Vec<String>,
        records: Vec<Record>,
        truth: Option<Vec<Truth>>,
    ) -> Result<Self> {
        if ids.len() != records.len() {
            return Err(ClickbaitError::data(format!(
                "{} ids for {} records",
                ids.len(),
                records.len()
            )));
        }
        if let Some(truth) = &truth {
            if truth.len() != records.len() {
                return Err(ClickbaitError::data(format!(
                    "{} truth entries for {} records",
                    truth.len(),
                    records.len()
                )));
            }
        }
        Ok(ClickbaitDataset {
            ids,
            records,
            truth,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn has_truth(&self) -> bool {
        self.truth.is_some()
    }

    /// Values of one field across the corpus, in corpus order.
    ///
    /// Records without the field yield [`FieldValue::Null`].
    pub fn get_x(&self, field: &str) -> Result<Vec<&FieldValue>> {
        if !self.records.iter().any(|r| r.has_field(field)) && !self.records.is_empty() {
            return Err(ClickbaitError::data(format!(
                "no record has field '{field}'"
            )));
        }
        Ok(self
            .records
            .iter()
            .map(|r| r.get(field).unwrap_or(&FieldValue::Null))
            .collect())
    }

    /// Mean clickbait judgment of every instance (regression target).
    pub fn get_y(&self) -> Result<Array1<f64>> {
        let truth = self.truth()?;
        Ok(truth.iter().map(|t| t.truth_mean).collect())
    }

    /// 1.0 for instances labelled `clickbait`, 0.0 otherwise (classification target).
    pub fn get_y_class(&self) -> Result<Array1<f64>> {
        let truth = self.truth()?;
        Ok(truth
            .iter()
            .map(|t| if t.is_clickbait() { 1.0 } else { 0.0 })
            .collect())
    }

    fn truth(&self) -> Result<&[Truth]> {
        self.truth
            .as_deref()
            .ok_or_else(|| ClickbaitError::data("dataset was loaded without a truth file"))
    }
}

/// Parse an instance stream into ids and records.
pub fn parse_instances<R: BufRead>(reader: R) -> Result<(Vec<String>, Vec<Record>)> {
    let mut ids = Vec::new();
    let mut records = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line).map_err(|e| {
            ClickbaitError::data(format!("instance line {}: {e}", line_num + 1))
        })?;
        let Value::Object(map) = value else {
            return Err(ClickbaitError::data(format!(
                "instance line {} is not a JSON object",
                line_num + 1
            )));
        };

        let mut record = Record::new();
        let mut id = None;
        for (key, val) in map {
            if key == "id" {
                id = Some(match &val {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                });
            }
            let field_value = if key == "postTimestamp" {
                parse_timestamp_value(&val, line_num + 1)?
            } else {
                convert_value(val)
            };
            record.add_field(key, field_value);
        }

        let id = id.ok_or_else(|| {
            ClickbaitError::data(format!("instance line {} has no id", line_num + 1))
        })?;
        ids.push(id);
        records.push(record);
    }

    Ok((ids, records))
}

/// Parse a truth stream into a map keyed by instance id.
pub fn parse_truth<R: BufRead>(reader: R) -> Result<HashMap<String, Truth>> {
    let mut by_id = HashMap::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let truth: Truth = serde_json::from_str(line)
            .map_err(|e| ClickbaitError::data(format!("truth line {}: {e}", line_num + 1)))?;
        by_id.insert(truth.id.clone(), truth);
    }
    Ok(by_id)
}

fn align_truth(ids: &[String], mut by_id: HashMap<String, Truth>) -> Result<Vec<Truth>> {
    ids.iter()
        .map(|id| {
            by_id
                .remove(id)
                .ok_or_else(|| ClickbaitError::data(format!("no truth for instance {id}")))
        })
        .collect()
}

/// Parse a corpus timestamp, falling back to RFC 3339.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ClickbaitError::data(format!("invalid timestamp '{s}': {e}")))
}

fn parse_timestamp_value(val: &Value, line: usize) -> Result<FieldValue> {
    match val {
        Value::String(s) => parse_timestamp(s)
            .map(FieldValue::DateTime)
            .map_err(|e| ClickbaitError::data(format!("instance line {line}: {e}"))),
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(FieldValue::DateTime)
            .ok_or_else(|| {
                ClickbaitError::data(format!("instance line {line}: invalid epoch {n}"))
            }),
        Value::Null => Ok(FieldValue::Null),
        other => Err(ClickbaitError::data(format!(
            "instance line {line}: unexpected timestamp {other}"
        ))),
    }
}

fn convert_value(val: Value) -> FieldValue {
    match val {
        Value::String(s) => FieldValue::Text(s),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                FieldValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                FieldValue::Float(f)
            } else {
                FieldValue::Text(n.to_string())
            }
        }
        Value::Bool(b) => FieldValue::Boolean(b),
        Value::Null => FieldValue::Null,
        Value::Array(items) => FieldValue::TextList(
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
        ),
        obj @ Value::Object(_) => FieldValue::Text(obj.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use std::io::Cursor;
    use std::io::Write;

    const INSTANCES: &str = r#"{"id": "608310377143799810", "postTimestamp": "Thu Jun 08 12:10:44 +0000 2017", "postText": ["You won't believe what happened next"], "postMedia": ["media/photo.jpg"], "targetParagraphs": ["First paragraph.", "Second one."], "targetTitle": "A title"}
{"id": "608310377143799811", "postTimestamp": "Sat Jun 10 23:59:00 +0000 2017", "postText": ["Parliament passes budget"], "postMedia": [], "targetParagraphs": [], "targetTitle": "Budget"}
"#;

    const TRUTH: &str = r#"{"id": "608310377143799811", "truthJudgments": [0.0, 0.0, 0.33333334, 0.0, 0.0], "truthMean": 0.06666667, "truthMedian": 0.0, "truthMode": 0.0, "truthClass": "no-clickbait"}
{"id": "608310377143799810", "truthJudgments": [1.0, 0.6666667, 1.0, 1.0, 1.0], "truthMean": 0.93333334, "truthMedian": 1.0, "truthMode": 1.0, "truthClass": "clickbait"}
"#;

    fn write_corpus(dir: &Path, truth: bool) {
        let mut f = File::create(dir.join(INSTANCES_FILE)).unwrap();
        f.write_all(INSTANCES.as_bytes()).unwrap();
        if truth {
            let mut f = File::create(dir.join(TRUTH_FILE)).unwrap();
            f.write_all(TRUTH.as_bytes()).unwrap();
        }
    }

    #[test]
    fn test_parse_instances() {
        let (ids, records) = parse_instances(Cursor::new(INSTANCES)).unwrap();
        assert_eq!(ids, vec!["608310377143799810", "608310377143799811"]);

        let first = &records[0];
        assert_eq!(
            first.get("postText").and_then(|v| v.as_text_list()),
            Some(&["You won't believe what happened next".to_string()][..])
        );
        let ts = first
            .get("postTimestamp")
            .and_then(|v| v.as_datetime())
            .unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2017, 6, 8));
        assert_eq!((ts.hour(), ts.minute()), (12, 10));
        assert_eq!(first.get("targetTitle"), Some(&FieldValue::Text("A title".into())));
        assert_eq!(
            records[1].get("postMedia"),
            Some(&FieldValue::TextList(vec![]))
        );
    }

    #[test]
    fn test_truth_aligned_by_id() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path(), true);

        let dataset = ClickbaitDataset::from_dir(dir.path()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert!(dataset.has_truth());

        let y = dataset.get_y().unwrap();
        assert!((y[0] - 0.93333334).abs() < 1e-9);
        assert!((y[1] - 0.06666667).abs() < 1e-9);
        assert_eq!(dataset.get_y_class().unwrap().to_vec(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_without_truth() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path(), false);

        let dataset = ClickbaitDataset::from_dir(dir.path()).unwrap();
        assert!(!dataset.has_truth());
        assert!(matches!(dataset.get_y(), Err(ClickbaitError::Data(_))));
        assert_eq!(dataset.get_x("postMedia").unwrap().len(), 2);
    }

    #[test]
    fn test_missing_truth_entry() {
        let truth = parse_truth(Cursor::new(TRUTH.lines().next().unwrap())).unwrap();
        let ids = vec!["608310377143799810".to_string()];
        assert!(matches!(
            align_truth(&ids, truth),
            Err(ClickbaitError::Data(_))
        ));
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let input = "{\"id\": \"1\"}\nnot json\n";
        match parse_instances(Cursor::new(input)) {
            Err(ClickbaitError::Data(msg)) => assert!(msg.contains("line 2")),
            other => panic!("expected data error, got {other:?}"),
        }
    }

    #[test]
    fn test_get_x_unknown_field() {
        let (ids, records) = parse_instances(Cursor::new(INSTANCES)).unwrap();
        let dataset = ClickbaitDataset::from_parts(ids, records, None).unwrap();
        assert!(dataset.get_x("nope").is_err());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let a = parse_timestamp("Thu Jun 08 12:10:44 +0000 2017").unwrap();
        let b = parse_timestamp("2017-06-08T12:10:44Z").unwrap();
        assert_eq!(a, b);
        assert!(parse_timestamp("yesterday").is_err());
    }
}
