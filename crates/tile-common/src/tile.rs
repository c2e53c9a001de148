//! Tile coordinates and grid row-origin conventions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A tile coordinate: column, row and zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Column (x)
    pub x: u32,
    /// Row (y)
    pub y: u32,
    /// Zoom level
    pub z: u32,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Generate a cache key string.
    pub fn cache_key(&self) -> String {
        format!("{}/{}/{}", self.z, self.x, self.y)
    }

    /// Bing-style quadkey for this tile.
    ///
    /// Quadkeys assume an upper-left origin; an empty string is returned for
    /// level 0.
    pub fn quadkey(&self) -> String {
        (1..=self.z)
            .rev()
            .map(|i| {
                let mask = 1u32 << (i - 1);
                let mut digit = b'0';
                if self.x & mask != 0 {
                    digit += 1;
                }
                if self.y & mask != 0 {
                    digit += 2;
                }
                digit as char
            })
            .collect()
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Where row 0 of a tile grid lives.
///
/// XYZ/WMTS services count rows from the top of the grid, TMS services count
/// them from the bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridOrigin {
    #[default]
    #[serde(alias = "ul", alias = "nw")]
    UpperLeft,
    #[serde(alias = "ll", alias = "sw")]
    LowerLeft,
}
