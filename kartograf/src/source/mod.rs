//! Sources of raster tiles.
//!
//! A [`TileSource`] knows how to get the encoded bytes of one tile and which numbering schema its
//! tiles use. [`MapSource`] wraps a tile source together with the parameters that control how its
//! tiles are placed into the map: visibility, transparency, z-order and the supported zoom levels.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::KartografError;
use crate::tile_schema::{TileIndex, TileSchema};

mod file_cache;
mod local;
mod rest;

pub use file_cache::{
    remove_parameters_modifier, FileCacheController, FileCachePathModifier,
    PersistentCacheController,
};
pub use local::LocalTileArchive;
pub use rest::RestTileSource;

/// Where the tiles of a source come from. Local and remote sources are acquired as separate
/// groups.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Tiles are read from the local file system.
    Local,
    /// Tiles are loaded over the network.
    Remote,
}

/// Provider of encoded tile images.
#[async_trait]
pub trait TileSource: Send + Sync {
    /// Kind of the source.
    fn kind(&self) -> SourceKind;

    /// Stable identifier of the source, used to name temporary tile files.
    fn key(&self) -> &str;

    /// Detects the numbering schema of the source's tiles.
    async fn resolve_schema(&self) -> TileSchema;

    /// Loads encoded bytes of the tile. The `index` is given in the numbering of `schema`.
    async fn fetch_tile(&self, index: TileIndex, schema: TileSchema)
        -> Result<Bytes, KartografError>;
}

/// A tile source with the parameters of its appearance on the map.
#[derive(Clone)]
pub struct MapSource {
    name: String,
    tile_source: Arc<dyn TileSource>,
    visible: bool,
    alpha: u8,
    z_order: i32,
    zoom_min: u32,
    zoom_max: u32,
    schema: Option<TileSchema>,
}

impl MapSource {
    /// Creates a visible, opaque source supporting all zoom levels.
    pub fn new(name: impl Into<String>, tile_source: Arc<dyn TileSource>) -> Self {
        Self {
            name: name.into(),
            tile_source,
            visible: true,
            alpha: 255,
            z_order: 0,
            zoom_min: 0,
            zoom_max: crate::tile_schema::MAX_ZOOM,
            schema: None,
        }
    }

    /// Sets visibility of the source.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Sets the alpha byte applied to every tile of the source.
    pub fn with_alpha(mut self, alpha: u8) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the drawing order. Sources with bigger values are drawn on top.
    pub fn with_z_order(mut self, z_order: i32) -> Self {
        self.z_order = z_order;
        self
    }

    /// Sets the range of supported zoom levels.
    pub fn with_zoom_range(mut self, zoom_min: u32, zoom_max: u32) -> Self {
        self.zoom_min = zoom_min.min(zoom_max);
        self.zoom_max = zoom_max.max(zoom_min);
        self
    }

    /// Forces the tile schema instead of detecting it from the source.
    pub fn with_schema(mut self, schema: TileSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Name of the source.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Underlying tile source.
    pub fn tile_source(&self) -> &Arc<dyn TileSource> {
        &self.tile_source
    }

    /// Whether the source takes part in map forming.
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Alpha byte of the source.
    pub fn alpha(&self) -> u8 {
        self.alpha
    }

    /// Drawing order.
    pub fn z_order(&self) -> i32 {
        self.z_order
    }

    /// Minimum supported zoom level.
    pub fn zoom_min(&self) -> u32 {
        self.zoom_min
    }

    /// Maximum supported zoom level.
    pub fn zoom_max(&self) -> u32 {
        self.zoom_max
    }

    /// Returns true if the source can provide tiles of the zoom level.
    pub fn supports_zoom(&self, zoom: u32) -> bool {
        (self.zoom_min..=self.zoom_max).contains(&zoom)
    }

    /// Kind of the underlying tile source.
    pub fn kind(&self) -> SourceKind {
        self.tile_source.kind()
    }

    /// Schema of the source: the forced one, or the one reported by the tile source.
    pub async fn resolve_schema(&self) -> TileSchema {
        match self.schema {
            Some(schema) => schema,
            None => self.tile_source.resolve_schema().await,
        }
    }
}

impl Debug for MapSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapSource")
            .field("name", &self.name)
            .field("key", &self.tile_source.key())
            .field("kind", &self.tile_source.kind())
            .field("visible", &self.visible)
            .field("alpha", &self.alpha)
            .field("z_order", &self.z_order)
            .field("zoom_min", &self.zoom_min)
            .field("zoom_max", &self.zoom_max)
            .field("schema", &self.schema)
            .finish()
    }
}
