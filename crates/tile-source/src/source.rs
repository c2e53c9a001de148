//! Tiled source: answers map queries with exactly one remote tile.
//!
//! A [`TiledSource`] sits between a map-rendering layer that asks for
//! arbitrary bbox/size/srs combinations and a tile service that only knows
//! `x/y/z`. A query is served only when it matches one tile of the grid
//! exactly; everything else is rejected rather than resampled or stitched.
//!
//! The pipeline for every query:
//!
//! 1. tile size must equal the grid tile size
//! 2. srs must equal the grid srs
//! 3. queries outside the coverage resolve to [`SourceResponse::NoContent`]
//! 4. the bbox must resolve to a single grid cell
//! 5. the row is flipped when the service counts rows from the other edge
//! 6. the tile is fetched; client failures become [`SourceError::Fetch`]

use std::sync::Arc;

use tile_common::{Coverage, ImageFormat, ImageOptions, MapExtent, TileCoord, TileGrid, TileImage};
use tracing::{debug, error, instrument, warn};

use crate::client::TileClient;
use crate::error::{SourceError, SourceResult};
use crate::query::MapQuery;

/// Successful outcome of a map query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceResponse {
    /// The tile as delivered by the client.
    Image(TileImage),
    /// The query lies outside the source coverage; nothing to draw.
    NoContent,
}

impl SourceResponse {
    pub fn is_no_content(&self) -> bool {
        matches!(self, Self::NoContent)
    }

    pub fn image(&self) -> Option<&TileImage> {
        match self {
            Self::Image(image) => Some(image),
            Self::NoContent => None,
        }
    }

    pub fn into_image(self) -> Option<TileImage> {
        match self {
            Self::Image(image) => Some(image),
            Self::NoContent => None,
        }
    }
}

/// Single-tile source on top of a [`TileClient`].
///
/// Holds no per-request state, so one instance can serve concurrent queries.
pub struct TiledSource<C> {
    grid: Arc<TileGrid>,
    client: C,
    inverse: bool,
    coverage: Option<Arc<dyn Coverage>>,
    image_opts: ImageOptions,
    extent: MapExtent,
}

impl<C: TileClient> TiledSource<C> {
    pub fn new(grid: Arc<TileGrid>, client: C) -> Self {
        let extent = grid.extent();
        Self {
            grid,
            client,
            inverse: false,
            coverage: None,
            image_opts: ImageOptions::default(),
            extent,
        }
    }

    /// Flip tile rows before fetching.
    ///
    /// Use when the service counts rows from the opposite edge of the grid.
    pub fn with_inverse(mut self, inverse: bool) -> Self {
        self.inverse = inverse;
        self
    }

    /// Restrict the source to `coverage`; the extent follows the coverage.
    pub fn with_coverage(mut self, coverage: Arc<dyn Coverage>) -> Self {
        self.extent = coverage.extent();
        self.coverage = Some(coverage);
        self
    }

    pub fn with_image_opts(mut self, image_opts: ImageOptions) -> Self {
        self.image_opts = image_opts;
        self
    }

    pub fn grid(&self) -> &Arc<TileGrid> {
        &self.grid
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn inverse(&self) -> bool {
        self.inverse
    }

    pub fn coverage(&self) -> Option<&Arc<dyn Coverage>> {
        self.coverage.as_ref()
    }

    pub fn image_opts(&self) -> &ImageOptions {
        &self.image_opts
    }

    /// Effective area of this source, fixed when the source was built.
    pub fn extent(&self) -> &MapExtent {
        &self.extent
    }

    /// Format a query is fetched in.
    pub fn format_for(&self, query: &MapQuery) -> ImageFormat {
        query.format.unwrap_or(self.image_opts.format)
    }

    /// Resolve `query` to the tile to fetch, in the service's row numbering.
    ///
    /// Returns `Ok(None)` when the query lies outside the coverage.
    pub fn resolve(&self, query: &MapQuery) -> SourceResult<Option<TileCoord>> {
        let tile_size = self.grid.tile_size();
        if query.size != tile_size {
            let err = SourceError::invalid_query(format!(
                "tile size of cache and tile source do not match: {:?} != {:?}",
                tile_size, query.size
            ));
            error!(error = %err, "Incompatible tile source");
            return Err(err);
        }

        if query.srs != self.grid.srs() {
            let err = SourceError::invalid_query(format!(
                "SRS of cache and tile source do not match: {} != {}",
                self.grid.srs(),
                query.srs
            ));
            error!(error = %err, "Incompatible tile source");
            return Err(err);
        }

        if let Some(coverage) = &self.coverage {
            if !coverage.intersects(&query.bbox, query.srs) {
                debug!("Query outside of coverage");
                return Ok(None);
            }
        }

        let mut affected = self
            .grid
            .get_affected_tiles(&query.bbox, query.size)
            .map_err(|e| SourceError::invalid_query(e.to_string()))?;

        if affected.grid != (1, 1) {
            return Err(SourceError::invalid_query("BBOX does not align to tile"));
        }

        let coord = affected
            .tiles
            .next()
            .ok_or_else(|| SourceError::invalid_query("BBOX does not align to tile"))?;

        let coord = if self.inverse {
            self.grid.flip_tile_coord(coord)
        } else {
            coord
        };

        Ok(Some(coord))
    }

    /// Answer a map query with the single tile it addresses.
    #[instrument(skip(self, query), fields(bbox = ?query.bbox, size = ?query.size, srs = %query.srs))]
    pub async fn get_map(&self, query: &MapQuery) -> SourceResult<SourceResponse> {
        let Some(coord) = self.resolve(query)? else {
            return Ok(SourceResponse::NoContent);
        };
        let format = self.format_for(query);
        debug!(tile = %coord, format = %format, "Fetching tile");

        match self.client.get_tile(coord, format).await {
            Ok(image) => Ok(SourceResponse::Image(image)),
            Err(e) => {
                warn!(tile = %coord, error = %e, "could not retrieve tile");
                Err(SourceError::fetch(e))
            }
        }
    }
}
