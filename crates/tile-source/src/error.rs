//! Error types for tile sources and tile clients.

use thiserror::Error;
use tile_common::TileCoord;

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors returned by [`TiledSource::get_map`](crate::TiledSource::get_map).
#[derive(Debug, Error)]
pub enum SourceError {
    /// The query can't be answered by this grid/source combination.
    ///
    /// Retrying the same query will fail the same way.
    #[error("invalid source query: {0}")]
    InvalidQuery(String),

    /// The remote tile could not be retrieved.
    #[error("{message}")]
    Fetch {
        message: String,
        #[source]
        source: ClientError,
    },
}

impl SourceError {
    /// Create an InvalidQuery error.
    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    /// Wrap a client failure, keeping it as the error source.
    pub fn fetch(source: ClientError) -> Self {
        Self::Fetch {
            message: source.to_string(),
            source,
        }
    }

    pub fn is_invalid_query(&self) -> bool {
        matches!(self, Self::InvalidQuery(_))
    }

    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }
}

impl From<ClientError> for SourceError {
    fn from(err: ClientError) -> Self {
        Self::fetch(err)
    }
}

/// Transport-level failures of a [`TileClient`](crate::TileClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// The request could not be completed.
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// The server answered with something that is not an image.
    #[error("response from {url} is not an image (content type {content_type})")]
    UnexpectedContentType { url: String, content_type: String },

    /// No URL can be built for the tile.
    #[error("cannot build URL for tile {coord}: {reason}")]
    InvalidTile { coord: TileCoord, reason: String },

    /// Any other transport failure, including cancellation.
    #[error("{0}")]
    Transport(String),
}

impl ClientError {
    /// Create a Transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Classify a reqwest failure for `url`.
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Request {
                url: url.to_string(),
                source: err,
            }
        }
    }
}
