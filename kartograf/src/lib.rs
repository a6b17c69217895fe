//! Kartograf forms printable map images.
//!
//! A map is formed for a geographic rectangle and a zoom level from any number of tile sources:
//! local tile archives and remote tile servers. The tiles of all sources are acquired
//! concurrently, composited into one raster in the order of their z-index, and geo-referenced
//! overlays (lines, polygons, circles, markers, text and coordinate grids) are drawn on top.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use kartograf::{
//!     FileTileStore, MapFormConfig, MapFormRequest, MapFormer, MapSource, RestTileSource,
//! };
//! use kartograf_types::geo::BoundingBox;
//!
//! # async fn form() -> Result<(), kartograf::KartografError> {
//! let osm = RestTileSource::new("https://tile.openstreetmap.org/{z}/{x}/{y}.png")?;
//! let former = MapFormer::new(
//!     MapFormConfig::default(),
//!     Arc::new(FileTileStore::new("./maps")?),
//! );
//!
//! let map = former
//!     .form_map(&MapFormRequest {
//!         bounding_box: BoundingBox::new(50.6, 50.3, 30.8, 30.2)?,
//!         zoom: 12,
//!         sources: vec![MapSource::new("osm", Arc::new(osm))],
//!         layers: vec![],
//!         output_name: "kyiv".into(),
//!     })
//!     .await?;
//! println!("Map saved to {:?}", map.path);
//! # Ok(())
//! # }
//! ```
//!
//! # Main components
//!
//! * [`tile_schema`] turns a bounding box into the range of tiles and checks the request against
//!   the size limits before anything is fetched.
//! * [`TileSource`] implementations ([`LocalTileArchive`], [`RestTileSource`]) load encoded tiles.
//! * [`TileAcquisition`] fetches the tiles of all sources and saves them into a [`TileStore`].
//! * [`Compositor`] merges the saved tiles into a single canvas.
//! * [`OverlayRenderer`](overlay::OverlayRenderer) draws [`overlay`] layers and grids.
//! * [`MapFormer`] runs the whole pipeline and reports its [`MapFormState`].

pub mod acquisition;
mod color;
pub mod compositor;
pub mod config;
mod decoded_image;
pub mod error;
mod map_former;
pub mod overlay;
pub mod progress;
pub mod source;
pub mod state;
pub mod store;
pub mod text;
pub mod tile_schema;

pub use acquisition::{FetchedTile, SourceTiles, TileAcquisition};
pub use color::Color;
pub use compositor::Compositor;
pub use config::{GridConfig, MapFormConfig, Sk42GridConfig};
pub use decoded_image::DecodedImage;
pub use error::KartografError;
pub use kartograf_types;
pub use map_former::{MapFormRequest, MapFormer, Preflight};
pub use progress::ProgressObserver;
pub use source::{
    FileCacheController, LocalTileArchive, MapSource, RestTileSource, SourceKind, TileSource,
};
pub use state::{FormStage, FormedMap, MapFormState, StateObserver};
pub use store::{FileTileStore, TileStore};
pub use text::{FontData, TextRasterizer};
pub use tile_schema::{TileIndex, TileRange, TileSchema};
