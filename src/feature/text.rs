//! Text helpers shared by the feature units.

use std::borrow::Cow;
use std::sync::LazyLock;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::pipeline::PipelineAnalyzer;
use crate::analysis::token::texts;
use crate::error::{ClickbaitError, Result};
use crate::record::FieldValue;

static WORDS: LazyLock<PipelineAnalyzer> = LazyLock::new(PipelineAnalyzer::words);

/// Text view of `value`, or a data error naming the unit that wanted text.
pub fn text_of<'a>(unit: &str, value: &'a FieldValue) -> Result<Cow<'a, str>> {
    value.text_content().ok_or_else(|| {
        ClickbaitError::data(format!(
            "{unit} expects text or a text list, got {}",
            value.type_name()
        ))
    })
}

/// Lower-cased word tokens of `text`.
pub fn words(text: &str) -> Result<Vec<String>> {
    Ok(texts(WORDS.analyze(text)?))
}

/// Number of sentences: runs of terminal punctuation, at least one for
/// non-empty text.
pub fn count_sentences(text: &str) -> usize {
    let mut sentences = 0;
    let mut open = false;
    let mut in_terminator = false;
    for c in text.chars() {
        if matches!(c, '.' | '!' | '?') {
            if !in_terminator {
                sentences += 1;
                in_terminator = true;
            }
            open = false;
        } else {
            in_terminator = false;
            if c.is_alphanumeric() {
                open = true;
            }
        }
    }
    // A trailing sentence without punctuation still counts.
    (sentences + usize::from(open)).max(1)
}

/// Heuristic English syllable count of a lower-cased word: vowel groups,
/// minus a silent trailing `e`, at least one.
pub fn count_syllables(word: &str) -> usize {
    let mut groups = 0;
    let mut in_vowel = false;
    for c in word.chars() {
        let vowel = matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
        if vowel && !in_vowel {
            groups += 1;
        }
        in_vowel = vowel;
    }
    let silent_e = word.len() > 2
        && word.ends_with('e')
        && !word.ends_with("le")
        && !word.ends_with("ee")
        && groups > 1;
    (groups - usize::from(silent_e)).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_of() {
        let list = FieldValue::TextList(vec!["a".into(), "b".into()]);
        assert_eq!(text_of("unit", &list).unwrap(), "a b");

        match text_of("unit", &FieldValue::Integer(1)) {
            Err(ClickbaitError::Data(msg)) => assert!(msg.contains("integer")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_words() {
        assert_eq!(
            words("10 Things You NEED to know!").unwrap(),
            vec!["10", "things", "you", "need", "to", "know"]
        );
        assert!(words("  ").unwrap().is_empty());
    }

    #[test]
    fn test_count_sentences() {
        assert_eq!(count_sentences("One. Two! Three?"), 3);
        assert_eq!(count_sentences("One. Two"), 2);
        assert_eq!(count_sentences("Wait..."), 1);
        assert_eq!(count_sentences(""), 1);
    }

    #[test]
    fn test_count_syllables() {
        assert_eq!(count_syllables("cat"), 1);
        assert_eq!(count_syllables("make"), 1);
        assert_eq!(count_syllables("table"), 2);
        assert_eq!(count_syllables("believe"), 2);
        assert_eq!(count_syllables("incredible"), 4);
        assert_eq!(count_syllables("the"), 1);
        assert_eq!(count_syllables("10"), 1);
    }
}
