//! Single-tile sources for tiled map services.
//!
//! [`TiledSource`] answers map queries (bbox, size, srs) from a service that
//! only serves fixed tiles, as long as each query addresses exactly one tile
//! of the service's grid. [`HttpTileClient`] fetches those tiles over HTTP
//! and [`TiledSourceConfig`] builds the whole stack from YAML.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod query;
pub mod source;
pub mod url;

pub use client::TileClient;
pub use config::{ConfigError, TiledSourceConfig};
pub use error::{ClientError, SourceError, SourceResult};
pub use http::{HttpClientConfig, HttpTileClient};
pub use query::MapQuery;
pub use source::{SourceResponse, TiledSource};
pub use url::{TileUrlTemplate, UrlTemplateError};
