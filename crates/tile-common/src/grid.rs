//! Fixed tile grids (tile pyramids).
//!
//! A [`TileGrid`] describes how a tiled service cuts the world into tiles:
//! the grid extent, the pixel size of a tile, the resolution of every zoom
//! level and whether rows are counted from the top or the bottom.

use thiserror::Error;

use crate::bbox::MERCATOR_MAX_EXTENT;
use crate::coverage::MapExtent;
use crate::{BoundingBox, CrsCode, GridOrigin, TileCoord};

/// Relative tolerance when matching a requested resolution to a grid level.
pub const RES_TOLERANCE: f64 = 1e-6;

/// Fraction of a tile a bbox edge may be off by and still count as aligned.
const TILE_EPSILON: f64 = 1e-6;

/// Resolution of Web Mercator level 0 with 256px tiles (meters/pixel).
const WEB_MERCATOR_RES_0: f64 = 156543.03392804097;

/// Resolution of WorldCRS84Quad level 0 with 256px tiles (degrees/pixel).
const WGS84_RES_0: f64 = 0.703125;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridError {
    #[error("invalid tile grid: {0}")]
    InvalidDefinition(String),

    #[error("invalid tile request: {0}")]
    InvalidRequest(String),

    #[error("no grid level matches resolution {resolution}")]
    NoMatchingResolution { resolution: f64 },

    #[error("bbox {bbox:?} is outside of the tile grid")]
    OutOfBounds { bbox: BoundingBox },
}

/// An immutable tile pyramid definition.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    srs: CrsCode,
    bbox: BoundingBox,
    tile_size: (u32, u32),
    resolutions: Vec<f64>,
    origin: GridOrigin,
    grid_sizes: Vec<(u32, u32)>,
}

impl TileGrid {
    /// Create a grid from its parts.
    ///
    /// `resolutions` are units per pixel, one per level, strictly decreasing.
    pub fn new(
        srs: CrsCode,
        bbox: BoundingBox,
        tile_size: (u32, u32),
        resolutions: Vec<f64>,
        origin: GridOrigin,
    ) -> Result<Self, GridError> {
        if !bbox.is_valid() {
            return Err(GridError::InvalidDefinition(format!(
                "grid bbox has no area: {:?}",
                bbox
            )));
        }
        if tile_size.0 == 0 || tile_size.1 == 0 {
            return Err(GridError::InvalidDefinition(format!(
                "tile size must be positive, got {:?}",
                tile_size
            )));
        }
        if resolutions.is_empty() {
            return Err(GridError::InvalidDefinition(
                "at least one resolution is required".to_string(),
            ));
        }
        if resolutions.iter().any(|r| !r.is_finite() || *r <= 0.0) {
            return Err(GridError::InvalidDefinition(
                "resolutions must be positive".to_string(),
            ));
        }
        if resolutions.windows(2).any(|w| w[1] >= w[0]) {
            return Err(GridError::InvalidDefinition(
                "resolutions must be strictly decreasing".to_string(),
            ));
        }

        let grid_sizes = Self::sizes_for(&bbox, tile_size, &resolutions);

        Ok(Self {
            srs,
            bbox,
            tile_size,
            resolutions,
            origin,
            grid_sizes,
        })
    }

    /// Global Web Mercator grid (EPSG:3857, 256px tiles, upper-left origin).
    pub fn web_mercator(levels: u32) -> Self {
        let max_extent = MERCATOR_MAX_EXTENT;
        Self::power_of_two(
            CrsCode::Epsg3857,
            BoundingBox::new(-max_extent, -max_extent, max_extent, max_extent),
            WEB_MERCATOR_RES_0,
            levels,
        )
    }

    /// Global geographic grid (EPSG:4326, 256px tiles, two columns at level 0).
    pub fn wgs84(levels: u32) -> Self {
        Self::power_of_two(
            CrsCode::Epsg4326,
            BoundingBox::new(-180.0, -90.0, 180.0, 90.0),
            WGS84_RES_0,
            levels,
        )
    }

    fn power_of_two(srs: CrsCode, bbox: BoundingBox, res_0: f64, levels: u32) -> Self {
        let resolutions: Vec<f64> = (0..levels.clamp(1, 31))
            .map(|z| res_0 / 2f64.powi(z as i32))
            .collect();
        let tile_size = (256, 256);
        let grid_sizes = Self::sizes_for(&bbox, tile_size, &resolutions);
        Self {
            srs,
            bbox,
            tile_size,
            resolutions,
            origin: GridOrigin::UpperLeft,
            grid_sizes,
        }
    }

    fn sizes_for(
        bbox: &BoundingBox,
        tile_size: (u32, u32),
        resolutions: &[f64],
    ) -> Vec<(u32, u32)> {
        resolutions
            .iter()
            .map(|res| {
                let cols = (bbox.width() / (res * tile_size.0 as f64) - TILE_EPSILON).ceil();
                let rows = (bbox.height() / (res * tile_size.1 as f64) - TILE_EPSILON).ceil();
                (cols.max(1.0) as u32, rows.max(1.0) as u32)
            })
            .collect()
    }

    /// Same grid with rows counted from the other edge.
    pub fn with_origin(mut self, origin: GridOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn srs(&self) -> CrsCode {
        self.srs
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Tile size in pixels (width, height).
    pub fn tile_size(&self) -> (u32, u32) {
        self.tile_size
    }

    pub fn origin(&self) -> GridOrigin {
        self.origin
    }

    pub fn resolutions(&self) -> &[f64] {
        &self.resolutions
    }

    /// Number of levels in the pyramid.
    pub fn levels(&self) -> u32 {
        self.resolutions.len() as u32
    }

    /// Number of tile columns and rows at level `z`.
    pub fn grid_size(&self, z: u32) -> Option<(u32, u32)> {
        self.grid_sizes.get(z as usize).copied()
    }

    /// Level whose resolution is closest to `res`.
    pub fn closest_level(&self, res: f64) -> Option<u32> {
        if !res.is_finite() || res <= 0.0 {
            return None;
        }
        self.resolutions
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let da = (a.ln() - res.ln()).abs();
                let db = (b.ln() - res.ln()).abs();
                da.total_cmp(&db)
            })
            .map(|(z, _)| z as u32)
    }

    /// Level whose resolution equals `res` within [`RES_TOLERANCE`].
    pub fn level_for_resolution(&self, res: f64) -> Result<u32, GridError> {
        self.closest_level(res)
            .filter(|&z| {
                let level_res = self.resolutions[z as usize];
                ((level_res - res) / level_res).abs() <= RES_TOLERANCE
            })
            .ok_or(GridError::NoMatchingResolution { resolution: res })
    }

    /// Resolve the tiles that together cover `bbox` rendered at `size` pixels.
    ///
    /// The horizontal and vertical resolution must both match the same level.
    /// The returned tile counts describe the full range the bbox touches,
    /// including tiles that would fall outside the grid; the iterator only
    /// yields tiles inside the grid, top row first.
    pub fn get_affected_tiles(
        &self,
        bbox: &BoundingBox,
        size: (u32, u32),
    ) -> Result<AffectedTiles, GridError> {
        if !bbox.is_valid() {
            return Err(GridError::InvalidRequest(format!(
                "bbox has no area: {:?}",
                bbox
            )));
        }
        if size.0 == 0 || size.1 == 0 {
            return Err(GridError::InvalidRequest(format!(
                "image size must be positive, got {:?}",
                size
            )));
        }

        // Pixels must be square at a grid level on both axes.
        let res_x = bbox.width() / size.0 as f64;
        let res_y = bbox.height() / size.1 as f64;
        let z = self.level_for_resolution(res_x.min(res_y))?;
        let level_res = self.resolutions[z as usize];
        for res in [res_x, res_y] {
            if ((level_res - res) / level_res).abs() > RES_TOLERANCE {
                return Err(GridError::NoMatchingResolution { resolution: res });
            }
        }
        let span_x = level_res * self.tile_size.0 as f64;
        let span_y = level_res * self.tile_size.1 as f64;

        let x0 = ((bbox.min_x - self.bbox.min_x) / span_x + TILE_EPSILON).floor() as i64;
        let x1 = ((bbox.max_x - self.bbox.min_x) / span_x - TILE_EPSILON).ceil() as i64;
        let (y0, y1) = match self.origin {
            GridOrigin::UpperLeft => (
                ((self.bbox.max_y - bbox.max_y) / span_y + TILE_EPSILON).floor() as i64,
                ((self.bbox.max_y - bbox.min_y) / span_y - TILE_EPSILON).ceil() as i64,
            ),
            GridOrigin::LowerLeft => (
                ((bbox.min_y - self.bbox.min_y) / span_y + TILE_EPSILON).floor() as i64,
                ((bbox.max_y - self.bbox.min_y) / span_y - TILE_EPSILON).ceil() as i64,
            ),
        };
        let (x1, y1) = (x1.max(x0 + 1), y1.max(y0 + 1));

        let (cols, rows) = self.grid_sizes[z as usize];
        if x1 <= 0 || y1 <= 0 || x0 >= cols as i64 || y0 >= rows as i64 {
            return Err(GridError::OutOfBounds { bbox: *bbox });
        }

        let min_x = self.bbox.min_x + x0 as f64 * span_x;
        let max_x = self.bbox.min_x + x1 as f64 * span_x;
        let (min_y, max_y) = match self.origin {
            GridOrigin::UpperLeft => (
                self.bbox.max_y - y1 as f64 * span_y,
                self.bbox.max_y - y0 as f64 * span_y,
            ),
            GridOrigin::LowerLeft => (
                self.bbox.min_y + y0 as f64 * span_y,
                self.bbox.min_y + y1 as f64 * span_y,
            ),
        };

        Ok(AffectedTiles {
            bbox: BoundingBox::new(min_x, min_y, max_x, max_y),
            grid: ((x1 - x0) as u32, (y1 - y0) as u32),
            tiles: TileIter {
                z,
                cols,
                rows,
                x0,
                x1,
                y0,
                y1,
                top_down: self.origin == GridOrigin::UpperLeft,
                next: 0,
            },
        })
    }

    /// Bounding box covered by a single tile, or `None` for unknown levels.
    pub fn tile_bbox(&self, coord: &TileCoord) -> Option<BoundingBox> {
        let res = *self.resolutions.get(coord.z as usize)?;
        let span_x = res * self.tile_size.0 as f64;
        let span_y = res * self.tile_size.1 as f64;

        let min_x = self.bbox.min_x + coord.x as f64 * span_x;
        let (min_y, max_y) = match self.origin {
            GridOrigin::UpperLeft => {
                let max_y = self.bbox.max_y - coord.y as f64 * span_y;
                (max_y - span_y, max_y)
            }
            GridOrigin::LowerLeft => {
                let min_y = self.bbox.min_y + coord.y as f64 * span_y;
                (min_y, min_y + span_y)
            }
        };

        Some(BoundingBox::new(min_x, min_y, min_x + span_x, max_y))
    }

    /// Convert a coordinate between upper-left and lower-left row numbering.
    ///
    /// Column and level are unchanged. Flipping twice returns the input.
    /// `coord.y` must be a row of the grid at `coord.z`.
    pub fn flip_tile_coord(&self, coord: TileCoord) -> TileCoord {
        let rows = self
            .grid_size(coord.z)
            .map_or(1u32 << coord.z.min(31), |(_, rows)| rows);
        debug_assert!(
            coord.y < rows,
            "row {} outside of grid with {} rows at level {}",
            coord.y,
            rows,
            coord.z
        );
        TileCoord {
            x: coord.x,
            y: rows.saturating_sub(1).saturating_sub(coord.y),
            z: coord.z,
        }
    }

    /// The area covered by this grid.
    pub fn extent(&self) -> MapExtent {
        MapExtent::new(self.bbox, self.srs)
    }
}

/// Result of resolving a bbox against a grid.
#[derive(Debug)]
pub struct AffectedTiles {
    /// Bbox of the whole affected tile range.
    pub bbox: BoundingBox,
    /// Number of tiles along x and y.
    pub grid: (u32, u32),
    /// The tiles themselves.
    pub tiles: TileIter,
}

/// Finite, non-restartable iterator over the tiles of an [`AffectedTiles`].
#[derive(Debug)]
pub struct TileIter {
    z: u32,
    cols: u32,
    rows: u32,
    x0: i64,
    x1: i64,
    y0: i64,
    y1: i64,
    top_down: bool,
    next: u64,
}

impl Iterator for TileIter {
    type Item = TileCoord;

    fn next(&mut self) -> Option<TileCoord> {
        let width = (self.x1 - self.x0) as u64;
        let total = width * (self.y1 - self.y0) as u64;

        while self.next < total {
            let i = self.next;
            self.next += 1;

            let x = self.x0 + (i % width) as i64;
            let row_offset = (i / width) as i64;
            let y = if self.top_down {
                self.y0 + row_offset
            } else {
                self.y1 - 1 - row_offset
            };

            if (0..self.cols as i64).contains(&x) && (0..self.rows as i64).contains(&y) {
                return Some(TileCoord::new(x as u32, y as u32, self.z));
            }
        }
        None
    }
}
