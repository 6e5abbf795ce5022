//! Post metadata: attached media and posting time.

use chrono::Timelike;
use serde::{Deserialize, Serialize};

use crate::error::{ClickbaitError, Result};
use crate::feature::{FeatureOutput, FeatureUnit};
use crate::persist;
use crate::record::FieldValue;

/// 1.0 when the post carries at least one media item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HasMediaAttached;

impl FeatureUnit for HasMediaAttached {
    fn kind(&self) -> &'static str {
        "has_media_attached"
    }

    fn width(&self) -> Option<usize> {
        Some(1)
    }

    fn transform(&self, value: &FieldValue) -> Result<FeatureOutput> {
        let attached = match value {
            FieldValue::TextList(items) => items.iter().any(|item| !item.trim().is_empty()),
            FieldValue::Text(item) => !item.trim().is_empty(),
            FieldValue::Null => false,
            other => {
                return Err(ClickbaitError::data(format!(
                    "has_media_attached expects a media list, got {}",
                    other.type_name()
                )));
            }
        };
        Ok(FeatureOutput::Scalar(if attached { 1.0 } else { 0.0 }))
    }

    fn box_clone(&self) -> Box<dyn FeatureUnit> {
        Box::new(*self)
    }

    fn save_state(&self) -> Result<Vec<u8>> {
        persist::encode(self)
    }
}

/// One-hot part of the day of a UTC timestamp:
/// `[night 0-5h, morning 6-11h, afternoon 12-17h, evening 18-23h]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PartOfDay;

impl PartOfDay {
    pub const WIDTH: usize = 4;

    /// Slot index of an hour of the day.
    pub fn slot(hour: u32) -> usize {
        (hour as usize / 6).min(Self::WIDTH - 1)
    }
}

impl FeatureUnit for PartOfDay {
    fn kind(&self) -> &'static str {
        "part_of_day"
    }

    fn width(&self) -> Option<usize> {
        Some(Self::WIDTH)
    }

    fn transform(&self, value: &FieldValue) -> Result<FeatureOutput> {
        let timestamp = value.as_datetime().ok_or_else(|| {
            ClickbaitError::data(format!(
                "part_of_day expects a timestamp, got {}",
                value.type_name()
            ))
        })?;
        let mut one_hot = vec![0.0; Self::WIDTH];
        one_hot[Self::slot(timestamp.hour())] = 1.0;
        Ok(FeatureOutput::Dense(one_hot))
    }

    fn box_clone(&self) -> Box<dyn FeatureUnit> {
        Box::new(*self)
    }

    fn save_state(&self) -> Result<Vec<u8>> {
        persist::encode(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_has_media() {
        let unit = HasMediaAttached;
        let with = FieldValue::TextList(vec!["media/608310377143799810.png".into()]);
        let without = FieldValue::TextList(vec![]);

        assert_eq!(unit.transform(&with).unwrap(), FeatureOutput::Scalar(1.0));
        assert_eq!(unit.transform(&without).unwrap(), FeatureOutput::Scalar(0.0));
        assert_eq!(
            unit.transform(&FieldValue::Null).unwrap(),
            FeatureOutput::Scalar(0.0)
        );
        assert!(unit.transform(&FieldValue::Integer(1)).is_err());
    }

    #[test]
    fn test_part_of_day_slots() {
        assert_eq!(PartOfDay::slot(0), 0);
        assert_eq!(PartOfDay::slot(5), 0);
        assert_eq!(PartOfDay::slot(6), 1);
        assert_eq!(PartOfDay::slot(12), 2);
        assert_eq!(PartOfDay::slot(23), 3);
    }

    #[test]
    fn test_part_of_day_one_hot() {
        let ts = Utc.with_ymd_and_hms(2017, 6, 8, 12, 10, 44).unwrap();
        assert_eq!(
            PartOfDay.transform(&FieldValue::DateTime(ts)).unwrap(),
            FeatureOutput::Dense(vec![0.0, 0.0, 1.0, 0.0])
        );
    }

    #[test]
    fn test_part_of_day_requires_timestamp() {
        assert!(matches!(
            PartOfDay.transform(&FieldValue::Text("noon".into())),
            Err(ClickbaitError::Data(_))
        ));
    }
}
