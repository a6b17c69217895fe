//! Geographic types and the projection math behind kartograf.
//!
//! Everything in this crate is pure and stateless: no I/O, no allocation beyond the returned
//! collections, safe to call from any thread.
//!
//! * [`geo`] contains geographic points and boxes, ellipsoid parameters, [`Projection`](geo::Projection)
//!   implementations for Web-Mercator and the SK-42 Gauss–Krüger grid, and Vincenty geodesics.
//! * [`tile`] contains slippy-map tile numbering.
//! * [`cartesian`] contains projected (meter or pixel) points and rectangles.

pub mod cartesian;
pub mod error;
pub mod geo;
pub mod tile;

pub use cartesian::{Point2d, Rect};
pub use error::KartografTypesError;
