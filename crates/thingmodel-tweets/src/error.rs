//! Error types for the tweet adapter.

use thingmodel_schema::{LatLng, SchemaError};

/// Transport-level failures of the inbound feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The HTTP request or body stream failed.
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failure to turn a single feed event into a thing.
///
/// These never end the ingestion loop; they are logged and counted.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The line is not valid UTF-8.
    #[error("feed line is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// The line exceeded the maximum line length and was discarded.
    #[error("feed line longer than {limit} bytes discarded")]
    LineTooLong { limit: usize },

    /// The line is not a JSON object of a known shape.
    #[error("malformed feed event: {0}")]
    Malformed(#[from] serde_json::Error),

    /// `created_at` could not be parsed.
    #[error("invalid created_at timestamp {0:?}")]
    InvalidTimestamp(String),

    /// The coordinate pair is outside WGS84 bounds.
    #[error("coordinate out of range: {0}")]
    InvalidLocation(LatLng),

    /// The tweet could not be built against the tweet type.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Errors that end an ingestion run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The feed transport failed.
    #[error("feed failed: {0}")]
    Feed(#[from] FeedError),
}
