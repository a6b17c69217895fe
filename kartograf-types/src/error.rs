//! Error type used by the crate.

use thiserror::Error;

/// Error enum.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KartografTypesError {
    /// Bounding box corners are not finite, out of range or in the wrong order.
    #[error("invalid bounding box: {0}")]
    InvalidBoundingBox(String),
    /// Gauss–Krüger zone outside of `1..=60`.
    #[error("invalid Gauss-Kruger zone {0}")]
    InvalidZone(u32),
}
