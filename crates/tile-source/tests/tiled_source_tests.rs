//! Behaviour of TiledSource against a scripted tile client.

use std::error::Error as _;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tile_common::{
    BBoxCoverage, BoundingBox, CrsCode, GridOrigin, ImageFormat, TileCoord, TileGrid, TileImage,
};
use tile_source::{ClientError, MapQuery, SourceError, SourceResponse, TileClient, TiledSource};

// ============================================================================
// Test client
// ============================================================================

/// Answers every request the same way and remembers what was asked.
struct ScriptedClient {
    calls: AtomicUsize,
    requests: Mutex<Vec<(TileCoord, ImageFormat)>>,
    fail_with: Option<fn() -> ClientError>,
}

impl ScriptedClient {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            fail_with: None,
        })
    }

    fn failing(fail_with: fn() -> ClientError) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            fail_with: Some(fail_with),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn requests(&self) -> Vec<(TileCoord, ImageFormat)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TileClient for ScriptedClient {
    async fn get_tile(
        &self,
        coord: TileCoord,
        format: ImageFormat,
    ) -> Result<TileImage, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push((coord, format));
        match self.fail_with {
            Some(fail) => Err(fail()),
            None => Ok(tile_body(coord, format)),
        }
    }
}

fn tile_body(coord: TileCoord, format: ImageFormat) -> TileImage {
    TileImage::new(format!("tile {}", coord.cache_key()).into_bytes(), format)
}

fn grid() -> Arc<TileGrid> {
    Arc::new(TileGrid::web_mercator(20))
}

fn query_for(grid: &TileGrid, coord: TileCoord) -> MapQuery {
    let bbox = grid.tile_bbox(&coord).unwrap();
    MapQuery::new(bbox, (256, 256), CrsCode::Epsg3857).with_format(ImageFormat::Png)
}

// ============================================================================
// Successful fetches
// ============================================================================

#[tokio::test]
async fn test_aligned_query_fetches_exactly_one_tile() {
    let grid = grid();
    let client = ScriptedClient::ok();
    let source = TiledSource::new(grid.clone(), client.clone());

    let response = source
        .get_map(&query_for(&grid, TileCoord::new(3, 5, 4)))
        .await
        .unwrap();

    assert_eq!(client.calls(), 1);
    assert_eq!(
        client.requests(),
        vec![(TileCoord::new(3, 5, 4), ImageFormat::Png)]
    );
    assert_eq!(
        response,
        SourceResponse::Image(tile_body(TileCoord::new(3, 5, 4), ImageFormat::Png))
    );
}

#[tokio::test]
async fn test_inverse_fetches_flipped_row() {
    let grid = grid();
    let client = ScriptedClient::ok();
    let source = TiledSource::new(grid.clone(), client.clone()).with_inverse(true);

    source
        .get_map(&query_for(&grid, TileCoord::new(3, 5, 4)))
        .await
        .unwrap();

    assert_eq!(
        client.requests(),
        vec![(TileCoord::new(3, 10, 4), ImageFormat::Png)]
    );
}

#[tokio::test]
async fn test_inverse_is_applied_once_per_query() {
    let grid = grid();
    let client = ScriptedClient::ok();
    let source = TiledSource::new(grid.clone(), client.clone()).with_inverse(true);

    for _ in 0..3 {
        source
            .get_map(&query_for(&grid, TileCoord::new(3, 5, 4)))
            .await
            .unwrap();
    }

    let rows: Vec<u32> = client.requests().iter().map(|(c, _)| c.y).collect();
    assert_eq!(rows, vec![10, 10, 10]);
}

#[tokio::test]
async fn test_inverse_bridges_lower_left_grid() {
    // Cache grid counts rows from the bottom, the service from the top.
    let grid = Arc::new(TileGrid::web_mercator(20).with_origin(GridOrigin::LowerLeft));
    let client = ScriptedClient::ok();
    let source = TiledSource::new(grid.clone(), client.clone()).with_inverse(true);

    let tms_coord = TileCoord::new(3, 10, 4);
    source.get_map(&query_for(&grid, tms_coord)).await.unwrap();

    let xyz_grid = TileGrid::web_mercator(20);
    let (fetched, _) = client.requests()[0];
    assert_eq!(fetched, TileCoord::new(3, 5, 4));
    let a = xyz_grid.tile_bbox(&fetched).unwrap();
    let b = grid.tile_bbox(&tms_coord).unwrap();
    assert!((a.min_y - b.min_y).abs() < 1e-6 && (a.max_y - b.max_y).abs() < 1e-6);
}

#[tokio::test]
async fn test_every_level_resolves_to_its_own_tile() {
    let grid = grid();
    let client = ScriptedClient::ok();
    let source = TiledSource::new(grid.clone(), client.clone());

    for z in 0..12u32 {
        let n = 1u32 << z;
        let coord = TileCoord::new(n / 3, n - 1, z);
        source.get_map(&query_for(&grid, coord)).await.unwrap();
        assert_eq!(client.requests().last().unwrap().0, coord);
    }
}

#[tokio::test]
async fn test_concurrent_queries_share_one_source() {
    let grid = grid();
    let client = ScriptedClient::ok();
    let source = Arc::new(TiledSource::new(grid.clone(), client.clone()));

    let coords: Vec<TileCoord> = (0..16).map(|x| TileCoord::new(x, 7, 4)).collect();
    let queries: Vec<MapQuery> = coords.iter().map(|c| query_for(&grid, *c)).collect();
    let results = futures::future::join_all(queries.iter().map(|q| source.get_map(q))).await;

    assert_eq!(client.calls(), 16);
    for (coord, result) in coords.iter().zip(results) {
        let image = result.unwrap().into_image().unwrap();
        assert_eq!(image, tile_body(*coord, ImageFormat::Png));
    }
}

// ============================================================================
// Incompatible queries
// ============================================================================

#[tokio::test]
async fn test_tile_size_mismatch_is_rejected_before_fetch() {
    let grid = grid();
    let client = ScriptedClient::ok();
    let source = TiledSource::new(grid.clone(), client.clone());

    let mut query = query_for(&grid, TileCoord::new(3, 5, 4));
    query.size = (512, 512);

    let err = source.get_map(&query).await.unwrap_err();
    assert!(err.is_invalid_query());
    assert!(err.to_string().contains("tile size"));
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_srs_mismatch_is_rejected() {
    let grid = grid();
    let client = ScriptedClient::ok();
    let source = TiledSource::new(grid.clone(), client.clone());

    let query = MapQuery::new(BoundingBox::new(0.0, 0.0, 22.5, 21.9), (256, 256), CrsCode::Epsg4326);
    let err = source.get_map(&query).await.unwrap_err();

    assert!(matches!(err, SourceError::InvalidQuery(ref msg) if msg.contains("SRS")));
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_size_is_checked_before_srs() {
    let grid = grid();
    let client = ScriptedClient::ok();
    let source = TiledSource::new(grid.clone(), client.clone());

    let query = MapQuery::new(BoundingBox::new(0.0, 0.0, 1.0, 1.0), (100, 100), CrsCode::Epsg4326);
    let err = source.get_map(&query).await.unwrap_err();
    assert!(err.to_string().contains("tile size"));
}

#[tokio::test]
async fn test_misaligned_bbox_is_rejected() {
    let grid = grid();
    let client = ScriptedClient::ok();
    let source = TiledSource::new(grid.clone(), client.clone());

    let tile = grid.tile_bbox(&TileCoord::new(3, 5, 4)).unwrap();
    let shift = tile.height() / 4.0;
    let bbox = BoundingBox::new(tile.min_x, tile.min_y + shift, tile.max_x, tile.max_y + shift);
    let query = MapQuery::new(bbox, (256, 256), CrsCode::Epsg3857);

    let err = source.get_map(&query).await.unwrap_err();
    assert!(matches!(err, SourceError::InvalidQuery(ref msg) if msg == "BBOX does not align to tile"));
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_partial_tile_bbox_is_rejected() {
    let grid = grid();
    let client = ScriptedClient::ok();
    let source = TiledSource::new(grid.clone(), client.clone());

    // Full tile width, top half of its height.
    let tile = grid.tile_bbox(&TileCoord::new(3, 5, 4)).unwrap();
    let top_half = BoundingBox::new(
        tile.min_x,
        tile.min_y + tile.height() / 2.0,
        tile.max_x,
        tile.max_y,
    );
    let err = source
        .get_map(&MapQuery::new(top_half, (256, 256), CrsCode::Epsg3857))
        .await
        .unwrap_err();
    assert!(err.is_invalid_query());

    // Left half of the width, full height.
    let left_half = BoundingBox::new(
        tile.min_x,
        tile.min_y,
        tile.min_x + tile.width() / 2.0,
        tile.max_y,
    );
    let err = source
        .get_map(&MapQuery::new(left_half, (256, 256), CrsCode::Epsg3857))
        .await
        .unwrap_err();
    assert!(err.is_invalid_query());

    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_multi_tile_bbox_is_rejected() {
    let grid = grid();
    let client = ScriptedClient::ok();
    let source = TiledSource::new(grid.clone(), client.clone());

    // Four level-5 tiles squeezed into 256px match level 4 only if aligned to it;
    // offset by one level-5 tile they straddle four level-4 tiles.
    let a = grid.tile_bbox(&TileCoord::new(7, 11, 5)).unwrap();
    let b = grid.tile_bbox(&TileCoord::new(8, 12, 5)).unwrap();
    let bbox = BoundingBox::new(a.min_x, b.min_y, b.max_x, a.max_y);
    let query = MapQuery::new(bbox, (256, 256), CrsCode::Epsg3857);

    let err = source.get_map(&query).await.unwrap_err();
    assert!(err.is_invalid_query());
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_resolution_between_levels_is_rejected() {
    let grid = grid();
    let client = ScriptedClient::ok();
    let source = TiledSource::new(grid.clone(), client.clone());

    let tile = grid.tile_bbox(&TileCoord::new(3, 5, 4)).unwrap();
    let bbox = BoundingBox::new(
        tile.min_x,
        tile.min_y,
        tile.min_x + tile.width() * 0.75,
        tile.min_y + tile.height() * 0.75,
    );
    let err = source
        .get_map(&MapQuery::new(bbox, (256, 256), CrsCode::Epsg3857))
        .await
        .unwrap_err();

    assert!(err.is_invalid_query());
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_bbox_outside_grid_is_rejected() {
    let grid = grid();
    let client = ScriptedClient::ok();
    let source = TiledSource::new(grid.clone(), client.clone());

    let tile = grid.tile_bbox(&TileCoord::new(15, 0, 4)).unwrap();
    let beyond = BoundingBox::new(tile.max_x, tile.min_y, tile.max_x + tile.width(), tile.max_y);
    let err = source
        .get_map(&MapQuery::new(beyond, (256, 256), CrsCode::Epsg3857))
        .await
        .unwrap_err();

    assert!(err.is_invalid_query());
    assert_eq!(client.calls(), 0);
}

// ============================================================================
// Coverage
// ============================================================================

#[tokio::test]
async fn test_query_outside_coverage_is_no_content() {
    let grid = grid();
    let client = ScriptedClient::ok();
    let coverage = BBoxCoverage::new(BoundingBox::new(5.0, 47.0, 15.0, 55.0), CrsCode::Epsg4326);
    let source = TiledSource::new(grid.clone(), client.clone()).with_coverage(Arc::new(coverage));

    // Level 4 tile in the south-west of the world
    let response = source
        .get_map(&query_for(&grid, TileCoord::new(2, 12, 4)))
        .await
        .unwrap();

    assert!(response.is_no_content());
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_query_inside_coverage_is_fetched() {
    let grid = grid();
    let client = ScriptedClient::ok();
    let coverage = BBoxCoverage::new(BoundingBox::new(5.0, 47.0, 15.0, 55.0), CrsCode::Epsg4326);
    let source = TiledSource::new(grid.clone(), client.clone()).with_coverage(Arc::new(coverage));

    // Level 4 tile over central Europe
    let response = source
        .get_map(&query_for(&grid, TileCoord::new(8, 5, 4)))
        .await
        .unwrap();

    assert!(!response.is_no_content());
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn test_incompatible_query_wins_over_coverage() {
    let grid = grid();
    let client = ScriptedClient::ok();
    let coverage = BBoxCoverage::new(BoundingBox::new(5.0, 47.0, 15.0, 55.0), CrsCode::Epsg4326);
    let source = TiledSource::new(grid.clone(), client.clone()).with_coverage(Arc::new(coverage));

    let mut query = query_for(&grid, TileCoord::new(2, 12, 4));
    query.size = (512, 512);
    assert!(source.get_map(&query).await.unwrap_err().is_invalid_query());
}

// ============================================================================
// Fetch failures
// ============================================================================

#[tokio::test]
async fn test_client_error_becomes_fetch_error() {
    let grid = grid();
    let client = ScriptedClient::failing(|| ClientError::Status {
        url: "http://tiles.example.com/4/3/5.png".to_string(),
        status: 503,
    });
    let source = TiledSource::new(grid.clone(), client.clone());

    let err = source
        .get_map(&query_for(&grid, TileCoord::new(3, 5, 4)))
        .await
        .unwrap_err();

    assert!(err.is_fetch());
    assert!(err.to_string().contains("HTTP 503 from http://tiles.example.com/4/3/5.png"));
    let source_err = err.source().unwrap();
    assert!(matches!(
        source_err.downcast_ref::<ClientError>(),
        Some(ClientError::Status { status: 503, .. })
    ));
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn test_cancellation_is_a_fetch_error() {
    let grid = grid();
    let client = ScriptedClient::failing(|| ClientError::transport("request cancelled"));
    let source = TiledSource::new(grid.clone(), client.clone());

    let err = source
        .get_map(&query_for(&grid, TileCoord::new(3, 5, 4)))
        .await
        .unwrap_err();

    match err {
        SourceError::Fetch { message, .. } => assert_eq!(message, "request cancelled"),
        other => panic!("expected fetch error, got {:?}", other),
    }
    assert_eq!(client.calls(), 1);
}
