//! Conversion between geographic and projected coordinates.

mod gauss_kruger;
mod web_mercator;

pub use gauss_kruger::{forward_sk42, inverse_sk42, zone_from_lon, GaussKruger};
pub use web_mercator::{degree_to_mercator, degrees_to_mercator, WebMercator};

/// Projection converts points from one coordinate system into another.
pub trait Projection {
    /// Type of the input points.
    type InPoint;
    /// Type of the output points.
    type OutPoint;

    /// Projects a point. Returns `None` if the point cannot be projected (e.g. it is outside of
    /// the projection domain).
    fn project(&self, input: &Self::InPoint) -> Option<Self::OutPoint>;

    /// Inverse of [`Projection::project`].
    fn unproject(&self, input: &Self::OutPoint) -> Option<Self::InPoint>;
}
