//! Common types shared by tile sources: bounding boxes, reference systems,
//! tile grids, coverages and encoded images.

pub mod bbox;
pub mod coverage;
pub mod crs;
pub mod grid;
pub mod image;
pub mod tile;

pub use bbox::BoundingBox;
pub use coverage::{BBoxCoverage, Coverage, MapExtent};
pub use crs::CrsCode;
pub use grid::{AffectedTiles, GridError, TileGrid, TileIter};
pub use image::{ImageFormat, ImageOptions, TileImage};
pub use tile::{GridOrigin, TileCoord};
