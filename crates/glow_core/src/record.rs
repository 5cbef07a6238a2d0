use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::date::{parse_instant, DayKey};
use crate::error::GlowError;

/// Routine id recorded when a check-in did not follow a known workout.
pub const UNKNOWN_ROUTINE: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckInId(String);

impl CheckInId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CheckInId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Image data URI or reference. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImagePayload(String);

impl ImagePayload {
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Front,
    Side,
}

impl ViewMode {
    pub fn toggle(self) -> Self {
        match self {
            ViewMode::Front => ViewMode::Side,
            ViewMode::Side => ViewMode::Front,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "front" => Some(ViewMode::Front),
            "side" => Some(ViewMode::Side),
            _ => None,
        }
    }
}

/// Output of a completed capture: both angles are required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImages {
    pub front: ImagePayload,
    pub side: ImagePayload,
}

/// Which angles a check-in carries. Records created before the front/side
/// split only have a single legacy image, which stands in for the front view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckInImages {
    LegacyOnly(ImagePayload),
    FrontOnly(ImagePayload),
    FrontAndSide {
        front: ImagePayload,
        side: ImagePayload,
    },
}

impl CheckInImages {
    pub fn front(&self) -> &ImagePayload {
        match self {
            CheckInImages::LegacyOnly(image) | CheckInImages::FrontOnly(image) => image,
            CheckInImages::FrontAndSide { front, .. } => front,
        }
    }

    pub fn side(&self) -> Option<&ImagePayload> {
        match self {
            CheckInImages::FrontAndSide { side, .. } => Some(side),
            CheckInImages::LegacyOnly(_) | CheckInImages::FrontOnly(_) => None,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, CheckInImages::LegacyOnly(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInRecord {
    id: CheckInId,
    date: DateTime<Utc>,
    images: CheckInImages,
    routine_id: String,
}

impl CheckInRecord {
    pub fn new(
        id: CheckInId,
        date: DateTime<Utc>,
        images: CheckInImages,
        routine_id: Option<&str>,
    ) -> Self {
        let routine_id = routine_id
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(UNKNOWN_ROUTINE)
            .to_string();
        Self {
            id,
            date,
            images,
            routine_id,
        }
    }

    pub fn from_capture(
        id: CheckInId,
        date: DateTime<Utc>,
        captured: CapturedImages,
        routine_id: Option<&str>,
    ) -> Self {
        let images = CheckInImages::FrontAndSide {
            front: captured.front,
            side: captured.side,
        };
        Self::new(id, date, images, routine_id)
    }

    pub fn id(&self) -> &CheckInId {
        &self.id
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn day(&self) -> DayKey {
        DayKey::of(self.date)
    }

    pub fn images(&self) -> &CheckInImages {
        &self.images
    }

    pub fn routine_id(&self) -> &str {
        &self.routine_id
    }
}

/// Image to show for `record` in `mode`. The side view never falls back to the
/// front image; callers render a "no side view" state instead.
pub fn image_for(record: &CheckInRecord, mode: ViewMode) -> Option<&ImagePayload> {
    match mode {
        ViewMode::Front => Some(record.images.front()),
        ViewMode::Side => record.images.side(),
    }
}

pub fn has_side(record: &CheckInRecord) -> bool {
    record.images.side().is_some()
}

/// Persisted shape of a check-in as kept in the key-value blob store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCheckIn {
    pub id: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<StoredImages>,
    #[serde(default)]
    pub course_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredImages {
    #[serde(default)]
    pub front: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
}

impl TryFrom<StoredCheckIn> for CheckInRecord {
    type Error = GlowError;

    fn try_from(stored: StoredCheckIn) -> Result<Self, Self::Error> {
        let date = parse_instant(&stored.date).map_err(|source| GlowError::MalformedTimestamp {
            id: stored.id.clone(),
            value: stored.date.clone(),
            source,
        })?;

        let (front, side) = match stored.images {
            Some(images) => (
                ImagePayload::new(images.front),
                images.side.and_then(ImagePayload::new),
            ),
            None => (None, None),
        };
        let legacy = stored.image_data.and_then(ImagePayload::new);

        let images = match (front, side, legacy) {
            (Some(front), Some(side), _) => CheckInImages::FrontAndSide { front, side },
            (Some(front), None, _) => CheckInImages::FrontOnly(front),
            (None, side, Some(legacy)) => {
                if side.is_some() {
                    tracing::debug!(id = %stored.id, "dropping side image of legacy check-in");
                }
                CheckInImages::LegacyOnly(legacy)
            }
            (None, _, None) => return Err(GlowError::MissingImage { id: stored.id }),
        };

        Ok(CheckInRecord::new(
            CheckInId::new(stored.id),
            date,
            images,
            Some(stored.course_id.as_str()),
        ))
    }
}

impl From<&CheckInRecord> for StoredCheckIn {
    fn from(record: &CheckInRecord) -> Self {
        let (image_data, images) = match &record.images {
            CheckInImages::LegacyOnly(image) => (Some(image.as_str().to_string()), None),
            CheckInImages::FrontOnly(front) => (
                None,
                Some(StoredImages {
                    front: front.as_str().to_string(),
                    side: None,
                }),
            ),
            CheckInImages::FrontAndSide { front, side } => (
                None,
                Some(StoredImages {
                    front: front.as_str().to_string(),
                    side: Some(side.as_str().to_string()),
                }),
            ),
        };
        Self {
            id: record.id.as_str().to_string(),
            date: record.date.to_rfc3339_opts(SecondsFormat::Millis, true),
            image_data,
            images,
            course_id: record.routine_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(json: &str) -> StoredCheckIn {
        serde_json::from_str(json).expect("valid stored check-in")
    }

    #[test]
    fn parses_modern_record_with_both_angles() {
        let record = CheckInRecord::try_from(stored(
            r#"{"id":"1714550400000","date":"2024-05-01T08:00:00.000Z",
                "images":{"front":"data:image/jpeg;base64,AAA","side":"data:image/jpeg;base64,BBB"},
                "courseId":"zone"}"#,
        ))
        .unwrap();
        assert_eq!(record.id().as_str(), "1714550400000");
        assert_eq!(record.routine_id(), "zone");
        assert!(has_side(&record));
        assert_eq!(
            image_for(&record, ViewMode::Side).map(ImagePayload::as_str),
            Some("data:image/jpeg;base64,BBB")
        );
    }

    #[test]
    fn legacy_image_stands_in_for_front_only() {
        let record = CheckInRecord::try_from(stored(
            r#"{"id":"1","date":"2023-12-31T20:00:00Z","imageData":"data:legacy","courseId":""}"#,
        ))
        .unwrap();
        assert!(record.images().is_legacy());
        assert_eq!(record.routine_id(), UNKNOWN_ROUTINE);
        assert_eq!(
            image_for(&record, ViewMode::Front).map(ImagePayload::as_str),
            Some("data:legacy")
        );
        assert_eq!(image_for(&record, ViewMode::Side), None);
        assert!(!has_side(&record));
    }

    #[test]
    fn front_wins_over_legacy_and_empty_side_is_absent() {
        let record = CheckInRecord::try_from(stored(
            r#"{"id":"2","date":"2024-01-01T00:00:00Z","imageData":"old",
                "images":{"front":"new","side":""},"courseId":"problem"}"#,
        ))
        .unwrap();
        assert_eq!(record.images(), &CheckInImages::FrontOnly(ImagePayload::new("new").unwrap()));
        assert_eq!(image_for(&record, ViewMode::Side), None);
    }

    #[test]
    fn rejects_records_without_any_image() {
        let err = CheckInRecord::try_from(stored(
            r#"{"id":"3","date":"2024-01-01T00:00:00Z","images":{"front":"  "},"courseId":"x"}"#,
        ))
        .unwrap_err();
        assert!(matches!(err, GlowError::MissingImage { ref id } if id == "3"));
    }

    #[test]
    fn rejects_malformed_dates_at_the_boundary() {
        let err = CheckInRecord::try_from(stored(
            r#"{"id":"4","date":"not a date","imageData":"img","courseId":"x"}"#,
        ))
        .unwrap_err();
        assert!(matches!(err, GlowError::MalformedTimestamp { ref value, .. } if value == "not a date"));
    }

    #[test]
    fn stored_form_keeps_the_legacy_shape() {
        let record = CheckInRecord::try_from(stored(
            r#"{"id":"5","date":"2024-02-02T10:00:00Z","imageData":"legacy","courseId":"zone"}"#,
        ))
        .unwrap();
        let json = serde_json::to_value(StoredCheckIn::from(&record)).unwrap();
        assert_eq!(json["imageData"], "legacy");
        assert!(json.get("images").is_none());
        assert_eq!(json["date"], "2024-02-02T10:00:00.000Z");
        assert_eq!(json["courseId"], "zone");
    }

    #[test]
    fn view_mode_toggles_and_parses() {
        assert_eq!(ViewMode::Front.toggle(), ViewMode::Side);
        assert_eq!(ViewMode::Side.toggle(), ViewMode::Front);
        assert_eq!(ViewMode::parse(" SIDE "), Some(ViewMode::Side));
        assert_eq!(ViewMode::parse("profile"), None);
    }
}
