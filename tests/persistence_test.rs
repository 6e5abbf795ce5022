use std::fs;

use clickbait::error::{ClickbaitError, Result};
use clickbait::feature::registry::{UnitRegistry, load_unit};
use clickbait::feature::{
    ContainsWordsFeature, FeatureOutput, FeatureUnit, MeanWordLength, NGramFeature, PartOfDay,
};
use clickbait::ml::ClickbaitModel;
use clickbait::persist::{self, MODEL_MAGIC, SCHEMA_MAGIC};
use clickbait::record::{FieldValue, Record};
use clickbait::schema::FeatureSchema;
use chrono::{TimeZone, Utc};
use ndarray::array;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

/// Counts a configurable character.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CharCount {
    needle: char,
}

impl FeatureUnit for CharCount {
    fn kind(&self) -> &'static str {
        "char_count"
    }

    fn width(&self) -> Option<usize> {
        Some(1)
    }

    fn transform(&self, value: &FieldValue) -> Result<FeatureOutput> {
        let text = value
            .text_content()
            .ok_or_else(|| ClickbaitError::data("expected text"))?;
        Ok(FeatureOutput::Scalar(
            text.chars().filter(|c| *c == self.needle).count() as f64,
        ))
    }

    fn box_clone(&self) -> Box<dyn FeatureUnit> {
        Box::new(self.clone())
    }

    fn save_state(&self) -> Result<Vec<u8>> {
        persist::encode(self)
    }
}

fn records() -> Vec<Record> {
    [
        ("You won't believe what this dog did", 8),
        ("Markets close higher on Friday", 17),
        ("Why everyone is talking about this recipe?", 21),
        ("Local elections: turnout rises", 2),
    ]
    .iter()
    .map(|(text, hour)| {
        Record::builder()
            .add_text("postText", *text)
            .add_datetime(
                "postTimestamp",
                Utc.with_ymd_and_hms(2017, 6, 8, *hour, 0, 0).unwrap(),
            )
            .build()
    })
    .collect()
}

fn built_schema() -> Result<FeatureSchema> {
    let mut schema = FeatureSchema::new();
    schema.add_feature(NGramFeature::word(2)?, "postText")?;
    schema.add_feature(
        ContainsWordsFeature::from_words(["you", "this", "why"]).ratio(true),
        "postText",
    )?;
    schema.add_feature(MeanWordLength, "postText")?;
    schema.add_feature(PartOfDay, "postTimestamp")?;
    schema.build(&records())?;
    Ok(schema)
}

#[test]
fn test_schema_round_trip() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("schema.bin");
    let schema = built_schema()?;
    schema.save(&path)?;

    let restored = FeatureSchema::load(&path)?;
    assert!(restored.is_built());
    assert_eq!(restored.len(), schema.len());
    assert_eq!(restored.width(), schema.width());
    assert_eq!(restored.column_ranges()?, schema.column_ranges()?);
    assert_eq!(restored.transform(&records())?, schema.transform(&records())?);

    let mut restored = restored;
    assert!(matches!(
        restored.add_feature(MeanWordLength, "postText"),
        Err(ClickbaitError::Configuration(_))
    ));
    Ok(())
}

#[test]
fn test_custom_unit_needs_registration() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("schema.bin");
    let mut schema = FeatureSchema::new();
    schema.add_feature(CharCount { needle: '?' }, "postText")?;
    let matrix = schema.build(&records())?;
    assert_eq!(matrix.get(2, 0), 1.0);
    schema.save(&path)?;

    assert!(matches!(
        FeatureSchema::load(&path),
        Err(ClickbaitError::CorruptState(_))
    ));

    let mut registry = UnitRegistry::default();
    registry.register("char_count", load_unit::<CharCount>);
    let restored = FeatureSchema::load_with_registry(&path, &registry)?;
    assert_eq!(restored.transform(&records())?, matrix);
    Ok(())
}

#[test]
fn test_damaged_schema_artifacts() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("schema.bin");
    built_schema()?.save(&path)?;
    let bytes = fs::read(&path)?;
    assert_eq!(&bytes[..4], SCHEMA_MAGIC);

    let damaged = dir.path().join("damaged.bin");

    // flipped payload byte
    let mut flipped = bytes.clone();
    let last = flipped.len() - 1;
    flipped[last] ^= 0xff;
    fs::write(&damaged, &flipped)?;
    assert!(matches!(
        FeatureSchema::load(&damaged),
        Err(ClickbaitError::CorruptState(_))
    ));

    // truncated
    fs::write(&damaged, &bytes[..bytes.len() / 2])?;
    assert!(matches!(
        FeatureSchema::load(&damaged),
        Err(ClickbaitError::CorruptState(_))
    ));

    // model magic
    let mut relabelled = bytes.clone();
    relabelled[..4].copy_from_slice(MODEL_MAGIC);
    fs::write(&damaged, &relabelled)?;
    assert!(matches!(
        FeatureSchema::load(&damaged),
        Err(ClickbaitError::CorruptState(_))
    ));

    assert!(matches!(
        FeatureSchema::load(dir.path().join("missing.bin")),
        Err(ClickbaitError::Io(_))
    ));
    Ok(())
}

#[test]
fn test_artifacts_are_not_interchangeable() -> Result<()> {
    let dir = TempDir::new()?;
    let schema_path = dir.path().join("schema.bin");
    let model_path = dir.path().join("model.bin");

    let schema = built_schema()?;
    schema.save(&schema_path)?;
    let features = schema.transform(&records())?;

    let mut trainer = ClickbaitModel::new();
    trainer.regress(&features, &array![0.9, 0.1, 0.8, 0.2], "Ridge", false)?;
    trainer.save(&model_path)?;
    let before = trainer.predict(&features)?;

    assert!(matches!(
        trainer.load(&schema_path),
        Err(ClickbaitError::CorruptState(_))
    ));
    assert!(matches!(
        FeatureSchema::load(&model_path),
        Err(ClickbaitError::CorruptState(_))
    ));
    assert_eq!(trainer.predict(&features)?, before);
    Ok(())
}
