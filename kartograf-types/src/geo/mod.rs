//! Geometries in geographic coordinates (latitude and longitude) (see [`GeoPoint`]) and conversion
//! between geographic and projected coordinate systems (see [`Projection`]).

mod bounding_box;
mod datum;
pub mod geodesic;
mod pixel;
mod point;
pub mod projection;

pub use bounding_box::BoundingBox;
pub use datum::Datum;
pub use geodesic::{Geodesic, GeodesicInverse};
pub use pixel::{convert_geo_to_pixel, PixelMapper};
pub use point::GeoPoint;
pub use projection::{GaussKruger, Projection, WebMercator};
