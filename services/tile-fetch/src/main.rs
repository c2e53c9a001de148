//! Command-line front end for a tiled source.
//!
//! Loads a source configuration, issues one map query and writes the
//! returned tile to disk. Handy for checking that a cache grid and a
//! remote tile service agree on tile addressing.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tile_common::{BoundingBox, CrsCode, ImageFormat, TileCoord};
use tile_source::{MapQuery, SourceResponse, TiledSourceConfig};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "tile-fetch")]
#[command(about = "Fetch one map image from a tiled source")]
struct Args {
    /// Source configuration file (YAML)
    #[arg(short, long, env = "TILE_SOURCE_CONFIG", default_value = "config/source.yaml")]
    config: PathBuf,

    /// Query bbox as minx,miny,maxx,maxy
    #[arg(long, conflicts_with = "tile")]
    bbox: Option<String>,

    /// Query the bbox of a grid tile, given as z/x/y
    #[arg(long)]
    tile: Option<String>,

    /// Image width in pixels (default: grid tile width)
    #[arg(long)]
    width: Option<u32>,

    /// Image height in pixels (default: grid tile height)
    #[arg(long)]
    height: Option<u32>,

    /// Query SRS (default: grid SRS)
    #[arg(long)]
    srs: Option<String>,

    /// Requested image format, as mime type or extension
    #[arg(long)]
    format: Option<String>,

    /// Output file
    #[arg(short, long, default_value = "tile.out")]
    output: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_tile(s: &str) -> Result<TileCoord> {
    let parts: Vec<&str> = s.trim().split('/').collect();
    if parts.len() != 3 {
        bail!("tile must be given as z/x/y, got '{}'", s);
    }
    let z = parts[0].parse().with_context(|| format!("invalid zoom in '{}'", s))?;
    let x = parts[1].parse().with_context(|| format!("invalid column in '{}'", s))?;
    let y = parts[2].parse().with_context(|| format!("invalid row in '{}'", s))?;
    Ok(TileCoord::new(x, y, z))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = TiledSourceConfig::load(&args.config)?;
    config.apply_env();
    let source = config.build()?;
    let grid = source.grid().clone();

    let bbox = match (&args.bbox, &args.tile) {
        (Some(bbox), _) => BoundingBox::from_bbox_string(bbox)?,
        (None, Some(tile)) => {
            let coord = parse_tile(tile)?;
            grid.tile_bbox(&coord)
                .with_context(|| format!("tile {} is not part of the grid", coord))?
        }
        (None, None) => bail!("either --bbox or --tile is required"),
    };

    let (tile_w, tile_h) = grid.tile_size();
    let size = (args.width.unwrap_or(tile_w), args.height.unwrap_or(tile_h));
    let srs = match &args.srs {
        Some(srs) => CrsCode::parse(srs)?,
        None => grid.srs(),
    };

    let mut query = MapQuery::new(bbox, size, srs);
    if let Some(format) = &args.format {
        query = query.with_format(ImageFormat::parse(format)?);
    }

    info!(bbox = ?query.bbox, size = ?query.size, srs = %query.srs, "Querying tiled source");

    match source.get_map(&query).await? {
        SourceResponse::Image(image) => {
            tokio::fs::write(&args.output, &image.data)
                .await
                .with_context(|| format!("failed to write {}", args.output.display()))?;
            info!(
                path = %args.output.display(),
                bytes = image.len(),
                format = %image.format,
                transparent = source.image_opts().transparent,
                "Tile written"
            );
        }
        SourceResponse::NoContent => {
            warn!("Query is outside the source coverage, nothing written");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tile() {
        assert_eq!(parse_tile("4/3/5").unwrap(), TileCoord::new(3, 5, 4));
        assert!(parse_tile("4/3").is_err());
        assert!(parse_tile("a/3/5").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "tile-fetch",
            "--config",
            "source.yaml",
            "--tile",
            "4/3/5",
            "--format",
            "jpeg",
        ])
        .unwrap();
        assert_eq!(args.config, PathBuf::from("source.yaml"));
        assert_eq!(args.tile.as_deref(), Some("4/3/5"));
        assert!(args.bbox.is_none());
        assert_eq!(args.output, PathBuf::from("tile.out"));
    }

    #[test]
    fn test_bbox_conflicts_with_tile() {
        let result = Args::try_parse_from([
            "tile-fetch",
            "--bbox",
            "0,0,1,1",
            "--tile",
            "0/0/0",
        ]);
        assert!(result.is_err());
    }
}
