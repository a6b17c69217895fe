//! Tile numbering schemas and the calculation of the [tile range](TileRange) covering a bounding
//! box.

use kartograf_types::geo::BoundingBox;
use kartograf_types::tile::{deg_to_tile, flip_y, tile_to_deg};
pub use kartograf_types::tile::MAX_ZOOM;
use serde::{Deserialize, Serialize};

use crate::error::KartografError;

/// Default limit of tiles in one map.
pub const MAX_TILES: u64 = 2_500;
/// Default limit of the estimated uncompressed raster size.
pub const MAX_ESTIMATED_BYTES: u64 = 584 * 1024 * 1024;
/// Width and height of a standard slippy-map tile.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Direction of the Y index of tiles.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileSchema {
    /// Tiles with `Y == 0` are at the top (north) of the map.
    #[default]
    Xyz,
    /// Tiles with `Y == 0` are at the bottom (south) of the map.
    Tms,
}

/// Tile index.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileIndex {
    /// X index.
    pub x: u32,
    /// Y index.
    pub y: u32,
    /// Z index.
    pub z: u32,
}

impl TileIndex {
    /// Create a new index instance.
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Converts an index given in `from` numbering into `to` numbering.
    ///
    /// Returns `None` if the row does not exist at the zoom level of the index.
    pub fn convert(self, from: TileSchema, to: TileSchema) -> Option<Self> {
        if from == to {
            Some(self)
        } else {
            Some(Self {
                y: flip_y(self.y, self.z)?,
                ..self
            })
        }
    }

    /// Converts an XYZ index into the numbering of the given schema.
    pub fn in_schema(self, schema: TileSchema) -> Option<Self> {
        self.convert(TileSchema::Xyz, schema)
    }

    /// Converts an index in the numbering of the given schema into XYZ.
    pub fn to_xyz(self, schema: TileSchema) -> Option<Self> {
        self.convert(schema, TileSchema::Xyz)
    }
}

/// Limits protecting the caller from requests that would exhaust memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionLimits {
    /// Maximum number of tiles in one request.
    pub max_tiles: u64,
    /// Maximum estimated RGBA size of the composite in bytes.
    pub max_bytes: u64,
}

impl Default for AcquisitionLimits {
    fn default() -> Self {
        Self {
            max_tiles: MAX_TILES,
            max_bytes: MAX_ESTIMATED_BYTES,
        }
    }
}

/// Rectangular set of XYZ tiles at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileRange {
    x_min: u32,
    x_max: u32,
    y_min: u32,
    y_max: u32,
    z: u32,
}

impl TileRange {
    /// Tiles covering the bounding box at the zoom level.
    pub fn from_bbox(bbox: &BoundingBox, zoom: u32) -> Result<Self, KartografError> {
        if zoom > MAX_ZOOM {
            return Err(KartografError::InvalidZoom(zoom));
        }

        let (x_min, y_min) = deg_to_tile(bbox.lat_north(), bbox.lon_west(), zoom);
        let (x_max, y_max) = deg_to_tile(bbox.lat_south(), bbox.lon_east(), zoom);

        Ok(Self {
            x_min,
            x_max,
            y_min,
            y_max,
            z: zoom,
        })
    }

    /// Minimum X index.
    pub fn x_min(&self) -> u32 {
        self.x_min
    }

    /// Maximum X index.
    pub fn x_max(&self) -> u32 {
        self.x_max
    }

    /// Minimum (northern) Y index.
    pub fn y_min(&self) -> u32 {
        self.y_min
    }

    /// Maximum (southern) Y index.
    pub fn y_max(&self) -> u32 {
        self.y_max
    }

    /// Zoom level.
    pub fn z(&self) -> u32 {
        self.z
    }

    /// Number of columns.
    pub fn columns(&self) -> u32 {
        self.x_max - self.x_min + 1
    }

    /// Number of rows.
    pub fn rows(&self) -> u32 {
        self.y_max - self.y_min + 1
    }

    /// Number of tiles in the range.
    pub fn count(&self) -> u64 {
        self.columns() as u64 * self.rows() as u64
    }

    /// Returns true if the XYZ index belongs to the range.
    pub fn contains(&self, index: &TileIndex) -> bool {
        index.z == self.z
            && (self.x_min..=self.x_max).contains(&index.x)
            && (self.y_min..=self.y_max).contains(&index.y)
    }

    /// Iterates over the XYZ indices of the range, row by row from the north-west corner.
    pub fn iter(&self) -> impl Iterator<Item = TileIndex> {
        let Self {
            x_min,
            x_max,
            y_min,
            y_max,
            z,
        } = *self;
        (y_min..=y_max).flat_map(move |y| (x_min..=x_max).map(move |x| TileIndex::new(x, y, z)))
    }

    /// Pixel offset of the tile's top-left corner in a mosaic of the range.
    pub fn pixel_offset(&self, index: &TileIndex, tile_size: u32) -> Option<(u32, u32)> {
        if !self.contains(index) {
            return None;
        }

        Some((
            (index.x - self.x_min) * tile_size,
            (index.y - self.y_min) * tile_size,
        ))
    }

    /// Size of a mosaic of the range in pixels.
    pub fn pixel_size(&self, tile_size: u32) -> (u32, u32) {
        (self.columns() * tile_size, self.rows() * tile_size)
    }

    /// Geographic box covered by the tiles, which is the box of the mosaic raster.
    pub fn bounding_box(&self) -> Result<BoundingBox, KartografError> {
        let north_west = tile_to_deg(self.x_min, self.y_min, self.z);
        let south_east = tile_to_deg(self.x_max + 1, self.y_max + 1, self.z);
        Ok(BoundingBox::new(
            north_west.lat(),
            south_east.lat(),
            south_east.lon(),
            north_west.lon(),
        )?)
    }
}

/// Uncompressed RGBA size of `tile_count` square tiles.
pub fn estimate_byte_size(tile_count: u64, tile_size: u32) -> u64 {
    tile_count * tile_size as u64 * tile_size as u64 * 4
}

/// Checks the range against the limits without touching any source.
pub fn check_limits(
    range: &TileRange,
    tile_size: u32,
    limits: &AcquisitionLimits,
) -> Result<u64, KartografError> {
    let count = range.count();
    if count > limits.max_tiles {
        return Err(KartografError::TooManyTiles {
            count,
            max: limits.max_tiles,
        });
    }

    let bytes = estimate_byte_size(count, tile_size);
    if bytes > limits.max_bytes {
        return Err(KartografError::TooLarge {
            bytes,
            max: limits.max_bytes,
        });
    }

    Ok(count)
}

/// Number of tiles needed to cover the box, or an error if it exceeds the limits.
pub fn count_tiles(
    bbox: &BoundingBox,
    zoom: u32,
    limits: &AcquisitionLimits,
) -> Result<u64, KartografError> {
    let range = TileRange::from_bbox(bbox, zoom)?;
    check_limits(&range, DEFAULT_TILE_SIZE, limits)
}

/// All XYZ tiles covering the box, or an error if they exceed the limits.
pub fn enumerate_tiles(
    bbox: &BoundingBox,
    zoom: u32,
    limits: &AcquisitionLimits,
) -> Result<Vec<TileIndex>, KartografError> {
    let range = TileRange::from_bbox(bbox, zoom)?;
    check_limits(&range, DEFAULT_TILE_SIZE, limits)?;
    Ok(range.iter().collect())
}
