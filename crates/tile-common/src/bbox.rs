//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

use crate::CrsCode;

/// Half the circumference of the earth in Web Mercator meters.
pub const MERCATOR_MAX_EXTENT: f64 = 20037508.342789244;

/// Latitude limit of the square Web Mercator world.
const MERCATOR_MAX_LAT: f64 = 85.0511287798066;

/// A geographic or projected bounding box.
///
/// For geographic CRS (EPSG:4326), coordinates are in degrees.
/// For projected CRS (EPSG:3857), coordinates are in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Parse a comma separated bbox string: "minx,miny,maxx,maxy"
    pub fn from_bbox_string(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let mut values = [0.0f64; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(part.to_string()))?;
        }

        let bbox = Self::new(values[0], values[1], values[2], values[3]);
        if !bbox.is_valid() {
            return Err(BboxParseError::Degenerate(s.to_string()));
        }
        Ok(bbox)
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// True if all corners are finite and the box has a positive area.
    pub fn is_valid(&self) -> bool {
        [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite())
            && self.max_x > self.min_x
            && self.max_y > self.min_y
    }

    /// Check if this bbox intersects another.
    ///
    /// Boxes that only share an edge do not intersect.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// Transform this bbox between two reference systems.
    ///
    /// Only the EPSG:4326 <-> EPSG:3857 pair is supported; returns `None` for
    /// anything else. Latitudes beyond the Mercator limit are clamped.
    pub fn transform(&self, from: CrsCode, to: CrsCode) -> Option<BoundingBox> {
        match (from, to) {
            (a, b) if a == b => Some(*self),
            (CrsCode::Epsg4326, CrsCode::Epsg3857) => {
                let (min_x, min_y) = lonlat_to_mercator(self.min_x, self.min_y);
                let (max_x, max_y) = lonlat_to_mercator(self.max_x, self.max_y);
                Some(BoundingBox::new(min_x, min_y, max_x, max_y))
            }
            (CrsCode::Epsg3857, CrsCode::Epsg4326) => {
                let (min_x, min_y) = mercator_to_lonlat(self.min_x, self.min_y);
                let (max_x, max_y) = mercator_to_lonlat(self.max_x, self.max_y);
                Some(BoundingBox::new(min_x, min_y, max_x, max_y))
            }
            _ => None,
        }
    }
}

/// Convert lon/lat degrees to Web Mercator meters.
pub fn lonlat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT);
    let x = lon * MERCATOR_MAX_EXTENT / 180.0;
    let y = (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln()
        * MERCATOR_MAX_EXTENT
        / std::f64::consts::PI;
    (x, y)
}

/// Convert Web Mercator meters to lon/lat degrees.
pub fn mercator_to_lonlat(x: f64, y: f64) -> (f64, f64) {
    let lon = x / MERCATOR_MAX_EXTENT * 180.0;
    let lat = (y / MERCATOR_MAX_EXTENT * std::f64::consts::PI)
        .sinh()
        .atan()
        .to_degrees();
    (lon, lat)
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid BBOX format: {0}. Expected 'minx,miny,maxx,maxy'")]
    InvalidFormat(String),

    #[error("Invalid number in BBOX: {0}")]
    InvalidNumber(String),

    #[error("BBOX has no area: {0}")]
    Degenerate(String),
}
