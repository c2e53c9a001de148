//! Tile URL templates.
//!
//! Templates name the tile address with `{placeholder}` segments:
//!
//! | Placeholder          | Expands to                                   |
//! |----------------------|----------------------------------------------|
//! | `{x}` `{y}` `{z}`    | column, row, level                           |
//! | `{format}`           | image extension (`png`, `jpeg`, ...)         |
//! | `{tms_path}`         | `z/x/y.format`                               |
//! | `{tc_path}`          | TileCache path `zz/xxx/xxx/xxx/yyy/yyy/yyy.format` |
//! | `{quadkey}`          | Bing-style quadkey                           |
//! | `{arcgiscache_path}` | `Lzz/Ryyyyyyyy/Cxxxxxxxx.format` (hex)       |
//! | `{bbox}`             | `minx,miny,maxx,maxy` of the tile            |

use std::fmt;

use thiserror::Error;
use tile_common::{ImageFormat, TileCoord, TileGrid};

use crate::error::ClientError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UrlTemplateError {
    #[error("unknown placeholder '{{{0}}}' in tile URL")]
    UnknownPlaceholder(String),

    #[error("unclosed '{{' in tile URL: {0}")]
    Unclosed(String),

    #[error("tile URL does not address a tile: {0}")]
    MissingTileAddress(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    X,
    Y,
    Z,
    Format,
    TmsPath,
    TcPath,
    Quadkey,
    ArcgisCachePath,
    Bbox,
}

impl Placeholder {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "x" => Some(Self::X),
            "y" => Some(Self::Y),
            "z" => Some(Self::Z),
            "format" => Some(Self::Format),
            "tms_path" => Some(Self::TmsPath),
            "tc_path" => Some(Self::TcPath),
            "quadkey" => Some(Self::Quadkey),
            "arcgiscache_path" => Some(Self::ArcgisCachePath),
            "bbox" => Some(Self::Bbox),
            _ => None,
        }
    }

    fn addresses_tile(self) -> bool {
        !matches!(self, Self::Format)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

/// A parsed tile URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileUrlTemplate {
    template: String,
    segments: Vec<Segment>,
}

impl TileUrlTemplate {
    pub fn parse(template: &str) -> Result<Self, UrlTemplateError> {
        let mut segments = Vec::new();
        let mut rest = template;

        while let Some(start) = rest.find('{') {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let after = &rest[start + 1..];
            let end = after
                .find('}')
                .ok_or_else(|| UrlTemplateError::Unclosed(template.to_string()))?;
            let name = &after[..end];
            let placeholder = Placeholder::parse(name)
                .ok_or_else(|| UrlTemplateError::UnknownPlaceholder(name.to_string()))?;
            segments.push(Segment::Placeholder(placeholder));
            rest = &after[end + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        let addresses_tile = segments
            .iter()
            .any(|s| matches!(s, Segment::Placeholder(p) if p.addresses_tile()));
        if !addresses_tile {
            return Err(UrlTemplateError::MissingTileAddress(template.to_string()));
        }

        Ok(Self {
            template: template.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Build the URL of one tile.
    ///
    /// `grid` is only consulted for `{bbox}`.
    pub fn expand(
        &self,
        coord: &TileCoord,
        format: ImageFormat,
        grid: &TileGrid,
    ) -> Result<String, ClientError> {
        let ext = format.extension();
        let mut url = String::with_capacity(self.template.len() + 32);

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => url.push_str(text),
                Segment::Placeholder(p) => match p {
                    Placeholder::X => url.push_str(&coord.x.to_string()),
                    Placeholder::Y => url.push_str(&coord.y.to_string()),
                    Placeholder::Z => url.push_str(&coord.z.to_string()),
                    Placeholder::Format => url.push_str(ext),
                    Placeholder::TmsPath => {
                        url.push_str(&format!("{}/{}/{}.{}", coord.z, coord.x, coord.y, ext))
                    }
                    Placeholder::TcPath => url.push_str(&tilecache_path(coord, ext)),
                    Placeholder::Quadkey => url.push_str(&coord.quadkey()),
                    Placeholder::ArcgisCachePath => url.push_str(&format!(
                        "L{:02}/R{:08x}/C{:08x}.{}",
                        coord.z, coord.y, coord.x, ext
                    )),
                    Placeholder::Bbox => {
                        let bbox = grid.tile_bbox(coord).ok_or_else(|| ClientError::InvalidTile {
                            coord: *coord,
                            reason: format!("level {} is not part of the grid", coord.z),
                        })?;
                        url.push_str(&format!(
                            "{},{},{},{}",
                            bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y
                        ));
                    }
                },
            }
        }

        Ok(url)
    }
}

impl fmt::Display for TileUrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

fn tilecache_path(coord: &TileCoord, ext: &str) -> String {
    format!(
        "{:02}/{:03}/{:03}/{:03}/{:03}/{:03}/{:03}.{}",
        coord.z,
        coord.x / 1_000_000,
        (coord.x / 1000) % 1000,
        coord.x % 1000,
        coord.y / 1_000_000,
        (coord.y / 1000) % 1000,
        coord.y % 1000,
        ext
    )
}
