//! Map queries.

use tile_common::{BoundingBox, CrsCode, ImageFormat};

/// A request for one rendered map image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapQuery {
    pub bbox: BoundingBox,
    /// Image size in pixels (width, height).
    pub size: (u32, u32),
    pub srs: CrsCode,
    /// Requested encoding; the source's image options apply when unset.
    pub format: Option<ImageFormat>,
}

impl MapQuery {
    pub fn new(bbox: BoundingBox, size: (u32, u32), srs: CrsCode) -> Self {
        Self {
            bbox,
            size,
            srs,
            format: None,
        }
    }

    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = Some(format);
        self
    }
}
