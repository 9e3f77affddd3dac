use chrono::{DateTime, NaiveDateTime, Utc};

use crate::foundation::error::{TimelapseError, TimelapseResult};

/// Grid coordinate of a placement, in tile units.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Cell {
    /// Column.
    pub x: i64,
    /// Row.
    pub y: i64,
}

/// One timestamped tile placement.
///
/// `texture` is a lower-case identifier such as `red_concrete`; the asset layout maps it to a
/// file on disk.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PlacementEvent {
    /// When the placement happened. Not necessarily unique.
    pub timestamp: DateTime<Utc>,
    /// Column in tile units.
    pub x: i64,
    /// Row in tile units.
    pub y: i64,
    /// Texture identifier.
    #[serde(rename = "c")]
    pub texture: String,
}

impl PlacementEvent {
    /// Build an event, normalizing the texture identifier to lower case.
    pub fn new(timestamp: DateTime<Utc>, x: i64, y: i64, texture: impl AsRef<str>) -> Self {
        Self {
            timestamp,
            x,
            y,
            texture: texture.as_ref().trim().to_ascii_lowercase(),
        }
    }

    /// Grid cell this event paints.
    pub fn cell(&self) -> Cell {
        Cell {
            x: self.x,
            y: self.y,
        }
    }
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

/// Parse a placement timestamp.
///
/// Accepts RFC 3339 (with offset) and offset-less ISO-like forms with `T` or space separators
/// and optional fractional seconds. Offset-less values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> TimelapseResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(TimelapseError::data_source(format!(
        "unrecognized timestamp '{raw}'"
    )))
}

#[cfg(test)]
#[path = "../../tests/unit/events/model.rs"]
mod tests;
