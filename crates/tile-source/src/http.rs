//! HTTP tile client backed by reqwest.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use tile_common::{ImageFormat, TileCoord, TileGrid, TileImage};
use tracing::{debug, instrument};

use crate::client::TileClient;
use crate::error::ClientError;
use crate::url::TileUrlTemplate;

/// Default User-Agent string for tile requests.
/// Some tile servers reject requests without one.
pub const DEFAULT_USER_AGENT: &str = concat!("tile-source/", env!("CARGO_PKG_VERSION"));

/// Connection settings for [`HttpTileClient`].
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Whole-request timeout
    pub timeout: Duration,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Fetches tiles with HTTP GET requests built from a URL template.
#[derive(Clone)]
pub struct HttpTileClient {
    client: Client,
    template: TileUrlTemplate,
    grid: Arc<TileGrid>,
}

impl HttpTileClient {
    pub fn new(
        template: TileUrlTemplate,
        grid: Arc<TileGrid>,
        config: &HttpClientConfig,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .tcp_nodelay(true)
            .build()
            .map_err(|e| ClientError::transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            template,
            grid,
        })
    }

    pub fn template(&self) -> &TileUrlTemplate {
        &self.template
    }

    /// URL a tile would be requested from.
    pub fn tile_url(&self, coord: &TileCoord, format: ImageFormat) -> Result<String, ClientError> {
        self.template.expand(coord, format, &self.grid)
    }
}

#[async_trait]
impl TileClient for HttpTileClient {
    #[instrument(skip(self), fields(tile = %coord))]
    async fn get_tile(
        &self,
        coord: TileCoord,
        format: ImageFormat,
    ) -> Result<TileImage, ClientError> {
        let url = self.tile_url(&coord, format)?;
        debug!(url = %url, "Requesting tile");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let image_format = match content_type {
            Some(ct) if !ct.trim().to_lowercase().starts_with("image/") => {
                return Err(ClientError::UnexpectedContentType {
                    url,
                    content_type: ct,
                });
            }
            Some(ct) => ImageFormat::parse(&ct).unwrap_or(format),
            None => format,
        };

        let data = response
            .bytes()
            .await
            .map_err(|e| ClientError::from_reqwest(&url, e))?;

        debug!(bytes = data.len(), format = %image_format, "Tile received");
        Ok(TileImage::new(data, image_format))
    }
}
