//! Decoding of streaming status events.
//!
//! The feed delivers one JSON object per line. Most lines are statuses;
//! the rest are control messages (deletions, rate-limit notices, location
//! scrubbing requests, stall warnings) that carry no tweet.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thingmodel_schema::LatLng;

use crate::error::EventError;

/// `created_at` format of the classic streaming API.
const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// A decoded feed line.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    Status(Box<Status>),
    Control(ControlKind),
}

impl FeedEvent {
    /// Decodes one feed line.
    pub fn parse(line: &str) -> Result<Self, EventError> {
        let value: serde_json::Value = serde_json::from_str(line)?;
        if let Some(kind) = ControlKind::detect(&value) {
            return Ok(Self::Control(kind));
        }
        let status: Status = serde_json::from_value(value)?;
        Ok(Self::Status(Box::new(status)))
    }
}

/// Stream control messages that are recognised and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Delete,
    Limit,
    ScrubGeo,
    Warning,
    Disconnect,
}

impl ControlKind {
    const ALL: [ControlKind; 5] = [
        Self::Delete,
        Self::Limit,
        Self::ScrubGeo,
        Self::Warning,
        Self::Disconnect,
    ];

    /// The top-level key identifying this message.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Limit => "limit",
            Self::ScrubGeo => "scrub_geo",
            Self::Warning => "warning",
            Self::Disconnect => "disconnect",
        }
    }

    fn detect(value: &serde_json::Value) -> Option<Self> {
        let object = value.as_object()?;
        Self::ALL
            .into_iter()
            .find(|kind| object.contains_key(kind.as_str()))
    }
}

impl std::fmt::Display for ControlKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The subset of a status object the adapter uses.
#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    pub id: u64,
    #[serde(alias = "full_text")]
    pub text: String,
    pub created_at: String,
    pub user: User,
    /// GeoJSON point, `[longitude, latitude]`.
    #[serde(default)]
    pub coordinates: Option<Point>,
    /// Legacy point, `[latitude, longitude]`.
    #[serde(default)]
    pub geo: Option<Point>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub name: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Point {
    pub coordinates: [f64; 2],
}

impl Status {
    /// Geographic position of the tweet, if it has one.
    ///
    /// `coordinates` takes precedence over the legacy `geo` field.
    pub fn location(&self) -> Option<LatLng> {
        if let Some(point) = self.coordinates {
            let [longitude, latitude] = point.coordinates;
            return Some(LatLng::new(latitude, longitude));
        }
        self.geo.map(|point| {
            let [latitude, longitude] = point.coordinates;
            LatLng::new(latitude, longitude)
        })
    }

    /// Parses `created_at`, accepting the streaming format and RFC 3339.
    pub fn created_at(&self) -> Result<DateTime<Utc>, EventError> {
        DateTime::parse_from_str(&self.created_at, CREATED_AT_FORMAT)
            .or_else(|_| DateTime::parse_from_rfc3339(&self.created_at))
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| EventError::InvalidTimestamp(self.created_at.clone()))
    }
}
