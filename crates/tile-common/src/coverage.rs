//! Coverage areas for tile sources.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::debug;

use crate::{BoundingBox, CrsCode};

/// A bbox together with the CRS it is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapExtent {
    pub bbox: BoundingBox,
    pub srs: CrsCode,
}

impl MapExtent {
    pub fn new(bbox: BoundingBox, srs: CrsCode) -> Self {
        Self { bbox, srs }
    }

    /// This extent expressed in `srs`, if the transformation is supported.
    pub fn bbox_for(&self, srs: CrsCode) -> Option<BoundingBox> {
        self.bbox.transform(self.srs, srs)
    }
}

/// The area where a source has data.
pub trait Coverage: Send + Sync + Debug {
    /// Whether `bbox` (expressed in `srs`) overlaps this coverage.
    fn intersects(&self, bbox: &BoundingBox, srs: CrsCode) -> bool;

    /// Full extent of the coverage.
    fn extent(&self) -> MapExtent;
}

/// Rectangular coverage.
#[derive(Debug, Clone, PartialEq)]
pub struct BBoxCoverage {
    extent: MapExtent,
}

impl BBoxCoverage {
    pub fn new(bbox: BoundingBox, srs: CrsCode) -> Self {
        Self {
            extent: MapExtent::new(bbox, srs),
        }
    }
}

impl Coverage for BBoxCoverage {
    fn intersects(&self, bbox: &BoundingBox, srs: CrsCode) -> bool {
        match self.extent.bbox_for(srs) {
            Some(coverage) => coverage.intersects(bbox),
            None => {
                // Without a transformation we can't rule the query out.
                debug!(
                    from = %self.extent.srs,
                    to = %srs,
                    "No bbox transformation for coverage check"
                );
                true
            }
        }
    }

    fn extent(&self) -> MapExtent {
        self.extent
    }
}
