//! Tile client abstraction.

use std::sync::Arc;

use async_trait::async_trait;
use tile_common::{ImageFormat, TileCoord, TileImage};

use crate::error::ClientError;

/// Fetches single tiles from a remote tile service.
///
/// Implementations own connection handling, timeouts and cancellation. A
/// client never retries on behalf of the caller.
#[async_trait]
pub trait TileClient: Send + Sync {
    /// Retrieve the tile at `coord`, encoded as `format`.
    ///
    /// `coord` is already expressed in the service's own row numbering.
    async fn get_tile(&self, coord: TileCoord, format: ImageFormat)
        -> Result<TileImage, ClientError>;
}

#[async_trait]
impl<T: TileClient + ?Sized> TileClient for Arc<T> {
    async fn get_tile(
        &self,
        coord: TileCoord,
        format: ImageFormat,
    ) -> Result<TileImage, ClientError> {
        (**self).get_tile(coord, format).await
    }
}
