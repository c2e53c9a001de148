//! YAML configuration for tiled sources.
//!
//! ```yaml
//! url: "https://tiles.example.com/{tms_path}"
//! grid:
//!   preset: web_mercator
//!   levels: 20
//!   origin: upper_left
//! inverse: false
//! format: image/png
//! coverage:
//!   bbox: [5.0, 47.0, 15.0, 55.0]
//!   srs: EPSG:4326
//! http:
//!   timeout_secs: 30
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tile_common::{
    BBoxCoverage, BoundingBox, CrsCode, GridError, GridOrigin, ImageFormat, ImageOptions, TileGrid,
};
use tracing::{debug, info};

use crate::error::ClientError;
use crate::http::{HttpClientConfig, HttpTileClient, DEFAULT_USER_AGENT};
use crate::source::TiledSource;
use crate::url::{TileUrlTemplate, UrlTemplateError};

/// Environment variable overriding the tile URL template.
pub const ENV_URL: &str = "TILE_SOURCE_URL";
/// Environment variable overriding the request timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "TILE_SOURCE_TIMEOUT_SECS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in tile source config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid tile source config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Url(#[from] UrlTemplateError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Root of a tile source configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct TiledSourceConfig {
    /// Tile URL template, see [`TileUrlTemplate`].
    pub url: String,
    #[serde(default)]
    pub grid: GridConfig,
    /// Service counts rows from the opposite edge of the grid.
    #[serde(default)]
    pub inverse: bool,
    #[serde(default)]
    pub format: ImageFormat,
    #[serde(default)]
    pub transparent: bool,
    #[serde(default)]
    pub coverage: Option<CoverageConfig>,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridPreset {
    #[default]
    WebMercator,
    Wgs84,
    Custom,
}

/// Tile grid definition.
#[derive(Debug, Clone, Deserialize)]
pub struct GridConfig {
    #[serde(default)]
    pub preset: GridPreset,
    /// Number of levels for the presets.
    #[serde(default = "default_levels")]
    pub levels: u32,
    #[serde(default)]
    pub origin: GridOrigin,
    // Custom grids only
    #[serde(default)]
    pub srs: Option<CrsCode>,
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
    #[serde(default)]
    pub resolutions: Option<Vec<f64>>,
    #[serde(default)]
    pub tile_size: Option<[u32; 2]>,
}

fn default_levels() -> u32 {
    20
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            preset: GridPreset::default(),
            levels: default_levels(),
            origin: GridOrigin::default(),
            srs: None,
            bbox: None,
            resolutions: None,
            tile_size: None,
        }
    }
}

impl GridConfig {
    pub fn build(&self) -> Result<TileGrid, ConfigError> {
        let grid = match self.preset {
            GridPreset::WebMercator => TileGrid::web_mercator(self.levels),
            GridPreset::Wgs84 => TileGrid::wgs84(self.levels),
            GridPreset::Custom => {
                let srs = self
                    .srs
                    .ok_or_else(|| ConfigError::Invalid("custom grid requires 'srs'".to_string()))?;
                let resolutions = self.resolutions.clone().ok_or_else(|| {
                    ConfigError::Invalid("custom grid requires 'resolutions'".to_string())
                })?;
                let bbox = self
                    .bbox
                    .map(|[min_x, min_y, max_x, max_y]| BoundingBox::new(min_x, min_y, max_x, max_y))
                    .unwrap_or_else(|| srs.valid_bounds());
                let [width, height] = self.tile_size.unwrap_or([256, 256]);
                return Ok(TileGrid::new(srs, bbox, (width, height), resolutions, self.origin)?);
            }
        };
        Ok(grid.with_origin(self.origin))
    }
}

/// Rectangular coverage of the source.
#[derive(Debug, Clone, Deserialize)]
pub struct CoverageConfig {
    pub bbox: [f64; 4],
    pub srs: CrsCode,
}

impl CoverageConfig {
    pub fn build(&self) -> Result<BBoxCoverage, ConfigError> {
        let [min_x, min_y, max_x, max_y] = self.bbox;
        let bbox = BoundingBox::new(min_x, min_y, max_x, max_y);
        if !bbox.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "coverage bbox has no area: {:?}",
                self.bbox
            )));
        }
        Ok(BBoxCoverage::new(bbox, self.srs))
    }
}

/// HTTP connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: None,
        }
    }
}

impl HttpConfig {
    pub fn client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            user_agent: self
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        }
    }
}

impl TiledSourceConfig {
    /// Parse a configuration from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&yaml)?;
        info!(path = %path.display(), url = %config.url, "Loaded tile source config");
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides looked up by environment variable name.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_URL) {
            debug!(url = %url, "Overriding tile URL from environment");
            self.url = url;
        }

        if let Some(secs) = lookup(ENV_TIMEOUT_SECS).and_then(|v| v.parse().ok()) {
            self.http.timeout_secs = secs;
        }
    }

    /// Check the configuration without building anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        TileUrlTemplate::parse(&self.url)?;
        self.grid.build()?;
        if let Some(coverage) = &self.coverage {
            coverage.build()?;
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "http.timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn image_opts(&self) -> ImageOptions {
        ImageOptions::new(self.format).transparent(self.transparent)
    }

    /// Build the source described by this configuration.
    pub fn build(&self) -> Result<TiledSource<HttpTileClient>, ConfigError> {
        self.validate()?;

        let grid = Arc::new(self.grid.build()?);
        let template = TileUrlTemplate::parse(&self.url)?;
        let client = HttpTileClient::new(template, grid.clone(), &self.http.client_config())?;

        let mut source = TiledSource::new(grid, client)
            .with_inverse(self.inverse)
            .with_image_opts(self.image_opts());
        if let Some(coverage) = &self.coverage {
            source = source.with_coverage(Arc::new(coverage.build()?));
        }

        Ok(source)
    }
}
