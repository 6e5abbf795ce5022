//! The clickbait feature set.
//!
//! [`clickbait_schema`] binds the post and article features in their
//! production column order. A model trained on one layout cannot score
//! matrices of another, so the order here is part of the model format.

use crate::config::FeatureConfig;
use crate::error::Result;
use crate::feature::{
    CharacterSum, ContainsWordsFeature, FleschKincaidScore, HasMediaAttached, LongestWordLength,
    MeanWordLength, NGramAnalyzer, NGramFeature, PartOfDay, SentimentPolarity, StartsWithNumber,
};
use crate::schema::FeatureSchema;

pub const POST_TEXT: &str = "postText";
pub const POST_MEDIA: &str = "postMedia";
pub const POST_TIMESTAMP: &str = "postTimestamp";
pub const TARGET_PARAGRAPHS: &str = "targetParagraphs";

pub const ABBREVIATIONS_LIST: &str = "OxfortAbbreviationsList.txt";
pub const EASY_WORDS_LIST: &str = "DaleChallEasyWordList.txt";
pub const STOP_WORDS_LIST: &str = "TerrierStopWordList.txt";
pub const CLICKBAIT_PHRASES_LIST: &str = "DownworthyCommonClickbaitPhrases.txt";
pub const GENERAL_INQUIRER_DIR: &str = "general-inquirer";

fn ngrams(config: &FeatureConfig, analyzer: NGramAnalyzer) -> Result<NGramFeature> {
    NGramFeature::new(analyzer, config.ngram_order, config.ngram_cutoff)
}

/// Assemble the unbuilt clickbait schema.
///
/// Word lists are read from `config.wordlist_dir`; a missing list is an I/O
/// error.
pub fn clickbait_schema(config: &FeatureConfig) -> Result<FeatureSchema> {
    config.validate()?;
    let lists = &config.wordlist_dir;
    let mut schema = FeatureSchema::new();

    schema.add_feature(ngrams(config, NGramAnalyzer::Char)?, POST_TEXT)?;
    schema.add_feature(ngrams(config, NGramAnalyzer::Word)?, POST_TEXT)?;
    schema.add_feature(
        ContainsWordsFeature::from_words(["#"]).only_words(false),
        POST_TEXT,
    )?;
    schema.add_feature(
        ContainsWordsFeature::from_words(["@"]).only_words(false),
        POST_TEXT,
    )?;
    schema.add_feature(SentimentPolarity, POST_TEXT)?;
    schema.add_feature(FleschKincaidScore, POST_TEXT)?;
    schema.add_feature(
        ContainsWordsFeature::from_file(lists.join(ABBREVIATIONS_LIST))?
            .only_words(false)
            .binary(true),
        POST_TEXT,
    )?;
    schema.add_feature(
        ContainsWordsFeature::from_words(["."]).only_words(false),
        POST_TEXT,
    )?;
    schema.add_feature(StartsWithNumber, POST_TEXT)?;
    schema.add_feature(LongestWordLength, POST_TEXT)?;
    schema.add_feature(MeanWordLength, POST_TEXT)?;
    schema.add_feature(CharacterSum, POST_TEXT)?;
    schema.add_feature(HasMediaAttached, POST_MEDIA)?;
    schema.add_feature(PartOfDay, POST_TIMESTAMP)?;
    schema.add_feature(
        ContainsWordsFeature::from_file(lists.join(EASY_WORDS_LIST))?.ratio(true),
        POST_TEXT,
    )?;
    schema.add_feature(
        ContainsWordsFeature::from_file(lists.join(STOP_WORDS_LIST))?.ratio(true),
        POST_TEXT,
    )?;
    schema.add_feature(
        ContainsWordsFeature::from_file(lists.join(CLICKBAIT_PHRASES_LIST))?.only_words(false),
        POST_TEXT,
    )?;

    if config.general_inquirer {
        schema.add_word_lists_from_dir(lists.join(GENERAL_INQUIRER_DIR), POST_TEXT)?;
    }

    if config.article_features {
        schema.add_feature(ngrams(config, NGramAnalyzer::Char)?, TARGET_PARAGRAPHS)?;
        schema.add_feature(ngrams(config, NGramAnalyzer::Word)?, TARGET_PARAGRAPHS)?;
        schema.add_feature(FleschKincaidScore, TARGET_PARAGRAPHS)?;
        schema.add_feature(MeanWordLength, TARGET_PARAGRAPHS)?;
    }

    log::debug!("clickbait schema has {} bindings", schema.len());
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClickbaitError;
    use crate::record::Record;
    use chrono::{TimeZone, Utc};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_word_lists(dir: &Path) {
        fs::write(dir.join(ABBREVIATIONS_LIST), "e.g.\ni.e.\n").unwrap();
        fs::write(dir.join(EASY_WORDS_LIST), "you\nthe\nwill\n").unwrap();
        fs::write(dir.join(STOP_WORDS_LIST), "the\na\nof\n").unwrap();
        fs::write(dir.join(CLICKBAIT_PHRASES_LIST), "you won't believe\n").unwrap();
        let gi = dir.join(GENERAL_INQUIRER_DIR);
        fs::create_dir(&gi).unwrap();
        fs::write(gi.join("Positiv.txt"), "good\nhappy\n").unwrap();
        fs::write(gi.join("Negativ.txt"), "bad\nsad\n").unwrap();
    }

    fn config(dir: &Path) -> FeatureConfig {
        FeatureConfig {
            wordlist_dir: dir.to_path_buf(),
            ngram_order: 2,
            ngram_cutoff: 1,
            ..FeatureConfig::default()
        }
    }

    fn record(text: &str, paragraphs: &[&str], hour: u32) -> Record {
        Record::builder()
            .add_text_list(POST_TEXT, vec![text.to_string()])
            .add_text_list(POST_MEDIA, vec![])
            .add_datetime(
                POST_TIMESTAMP,
                Utc.with_ymd_and_hms(2017, 6, 1, hour, 0, 0).unwrap(),
            )
            .add_text_list(
                TARGET_PARAGRAPHS,
                paragraphs.iter().map(|p| p.to_string()).collect(),
            )
            .build()
    }

    #[test]
    fn test_binding_order() {
        let dir = TempDir::new().unwrap();
        write_word_lists(dir.path());

        let schema = clickbait_schema(&config(dir.path())).unwrap();
        assert_eq!(schema.len(), 17 + 2 + 4);

        let kinds: Vec<&str> = schema.bindings().iter().map(|b| b.unit().kind()).collect();
        assert_eq!(&kinds[..2], ["ngram", "ngram"]);
        assert_eq!(kinds[4], "sentiment_polarity");
        assert_eq!(kinds[13], "part_of_day");
        assert_eq!(schema.bindings()[12].field(), POST_MEDIA);
        assert_eq!(schema.bindings()[13].field(), POST_TIMESTAMP);
        assert_eq!(schema.bindings()[19].field(), TARGET_PARAGRAPHS);
    }

    #[test]
    fn test_optional_blocks() {
        let dir = TempDir::new().unwrap();
        write_word_lists(dir.path());

        let schema = clickbait_schema(&FeatureConfig {
            general_inquirer: false,
            article_features: false,
            ..config(dir.path())
        })
        .unwrap();
        assert_eq!(schema.len(), 17);
        assert!(schema.bindings().iter().all(|b| b.field() != TARGET_PARAGRAPHS));
    }

    #[test]
    fn test_build_on_posts() {
        let dir = TempDir::new().unwrap();
        write_word_lists(dir.path());
        let records = vec![
            record("You won't believe this #wow", &["A long story."], 9),
            record("Budget passed by parliament", &["The vote was close."], 22),
            record("10 things, e.g. cats", &["Cats are good."], 3),
        ];

        let mut schema = clickbait_schema(&config(dir.path())).unwrap();
        let matrix = schema.build(&records).unwrap();
        assert_eq!(matrix.nrows(), 3);
        assert_eq!(Some(matrix.ncols()), schema.width());
        assert!(matrix.is_sparse());

        let ranges = schema.column_ranges().unwrap();
        // hashtag count
        assert_eq!(matrix.get(0, ranges[2].start), 1.0);
        // starts with a number
        assert_eq!(matrix.get(2, ranges[8].start), 1.0);
        // part of day one-hot: morning, evening, night
        assert_eq!(matrix.get(0, ranges[13].start + 1), 1.0);
        assert_eq!(matrix.get(1, ranges[13].start + 3), 1.0);
        assert_eq!(matrix.get(2, ranges[13].start), 1.0);

        assert_eq!(schema.transform(&records).unwrap(), matrix);
    }

    #[test]
    fn test_missing_word_list() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            clickbait_schema(&config(dir.path())),
            Err(ClickbaitError::Io(_))
        ));
    }
}
