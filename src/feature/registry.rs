//! Kind-to-loader registry used when a persisted schema is read back.

use ahash::AHashMap;
use serde::de::DeserializeOwned;

use crate::error::{ClickbaitError, Result};
use crate::feature::{
    CharacterSum, ContainsWordsFeature, FeatureUnit, FleschKincaidScore, HasMediaAttached,
    LongestWordLength, MeanWordLength, NGramFeature, PartOfDay, SentimentPolarity,
    StartsWithNumber,
};
use crate::persist;

/// Restores a boxed unit from the bytes produced by [`FeatureUnit::save_state`].
pub type UnitLoader = fn(&[u8]) -> Result<Box<dyn FeatureUnit>>;

/// Loader for any unit whose state is its own serde representation.
pub fn load_unit<U>(state: &[u8]) -> Result<Box<dyn FeatureUnit>>
where
    U: FeatureUnit + DeserializeOwned + 'static,
{
    Ok(Box::new(persist::decode::<U>(state)?))
}

/// Maps unit kinds to loaders.
///
/// [`UnitRegistry::default`] knows every built-in unit. Custom units register
/// their own loader before a schema containing them is loaded:
///
/// ```
/// use clickbait::feature::registry::{UnitRegistry, load_unit};
/// use clickbait::feature::CharacterSum;
///
/// let mut registry = UnitRegistry::new();
/// registry.register("character_sum", load_unit::<CharacterSum>);
/// assert!(registry.contains("character_sum"));
/// ```
#[derive(Debug, Clone)]
pub struct UnitRegistry {
    loaders: AHashMap<String, UnitLoader>,
}

impl UnitRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        UnitRegistry {
            loaders: AHashMap::new(),
        }
    }

    /// Create a registry with every built-in unit.
    pub fn with_builtin() -> Self {
        let mut registry = UnitRegistry::new();
        registry.register("contains_words", load_unit::<ContainsWordsFeature>);
        registry.register("ngram", load_unit::<NGramFeature>);
        registry.register("flesch_kincaid", load_unit::<FleschKincaidScore>);
        registry.register("starts_with_number", load_unit::<StartsWithNumber>);
        registry.register("longest_word_length", load_unit::<LongestWordLength>);
        registry.register("mean_word_length", load_unit::<MeanWordLength>);
        registry.register("character_sum", load_unit::<CharacterSum>);
        registry.register("has_media_attached", load_unit::<HasMediaAttached>);
        registry.register("part_of_day", load_unit::<PartOfDay>);
        registry.register("sentiment_polarity", load_unit::<SentimentPolarity>);
        registry
    }

    /// Register (or replace) the loader of a unit kind.
    pub fn register<S: Into<String>>(&mut self, kind: S, loader: UnitLoader) {
        self.loaders.insert(kind.into(), loader);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.loaders.contains_key(kind)
    }

    /// Registered kinds in sorted order.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.loaders.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Restore a unit of `kind` from its persisted state.
    pub fn load(&self, kind: &str, state: &[u8]) -> Result<Box<dyn FeatureUnit>> {
        let loader = self.loaders.get(kind).ok_or_else(|| {
            ClickbaitError::corrupt_state(format!("no loader registered for unit kind '{kind}'"))
        })?;
        let unit = loader(state)?;
        if unit.kind() != kind {
            return Err(ClickbaitError::corrupt_state(format!(
                "loader for '{kind}' produced a '{}' unit",
                unit.kind()
            )));
        }
        Ok(unit)
    }
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::FeatureOutput;
    use crate::record::FieldValue;

    #[test]
    fn test_builtin_kinds() {
        let registry = UnitRegistry::default();
        assert_eq!(registry.kinds().len(), 10);
        assert!(registry.contains("ngram"));
        assert!(registry.contains("part_of_day"));
    }

    #[test]
    fn test_round_trip_through_registry() {
        let unit = ContainsWordsFeature::from_words(["you", "won't"]).ratio(true);
        let state = unit.save_state().unwrap();

        let restored = UnitRegistry::default()
            .load("contains_words", &state)
            .unwrap();
        let value = FieldValue::Text("You won't believe it".into());
        assert_eq!(
            restored.transform(&value).unwrap(),
            unit.transform(&value).unwrap()
        );
        assert!(matches!(
            restored.transform(&value).unwrap(),
            FeatureOutput::Scalar(_)
        ));
    }

    #[test]
    fn test_unknown_kind() {
        let registry = UnitRegistry::new();
        assert!(matches!(
            registry.load("mystery", &[]),
            Err(ClickbaitError::CorruptState(_))
        ));
    }

    #[test]
    fn test_kind_mismatch() {
        let mut registry = UnitRegistry::new();
        registry.register("ngram", load_unit::<CharacterSum>);
        let state = CharacterSum.save_state().unwrap();
        assert!(matches!(
            registry.load("ngram", &state),
            Err(ClickbaitError::CorruptState(_))
        ));
    }
}
