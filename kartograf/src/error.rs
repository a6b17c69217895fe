//! Error types used by the crate.

use kartograf_types::KartografTypesError;
use thiserror::Error;

/// Kartograf error type.
///
/// The `Display` text of every variant is meant to be shown to the user as is.
#[derive(Debug, Error)]
pub enum KartografError {
    /// The area requires more tiles than allowed.
    #[error("the selected area requires {count} tiles, the maximum is {max}; reduce the zoom level or the area")]
    TooManyTiles {
        /// Number of tiles the request needs.
        count: u64,
        /// Configured limit.
        max: u64,
    },
    /// The estimated raster size is larger than allowed.
    #[error("the map would take about {} MB, the maximum is {} MB; reduce the zoom level or the area", .bytes / 1_048_576, .max / 1_048_576)]
    TooLarge {
        /// Estimated size in bytes.
        bytes: u64,
        /// Configured limit.
        max: u64,
    },
    /// No visible source supports the requested zoom level.
    #[error("zoom level {0} is not supported by the map sources")]
    InvalidZoom(u32),
    /// Bad bounding box.
    #[error("{0}")]
    InvalidBoundingBox(#[from] KartografTypesError),
    /// The output raster cannot be allocated.
    #[error("failed to allocate a {width}x{height} canvas")]
    CanvasAllocation {
        /// Canvas width in pixels.
        width: u32,
        /// Canvas height in pixels.
        height: u32,
    },
    /// Network error.
    #[error("failed to load data: {0}")]
    Http(String),
    /// Item not found.
    #[error("item not found")]
    NotFound,
    /// The operation was cancelled by the caller.
    #[error("map forming was cancelled")]
    Cancelled,
    /// Image decoding or encoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    /// Error reading/writing data to the FS.
    #[error("file system error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid JSON of configuration or state.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Font could not be loaded or parsed.
    #[error("font error: {0}")]
    Font(String),
    /// Generic error - details are inside.
    #[error("{0}")]
    Generic(String),
}

impl From<reqwest::Error> for KartografError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value.to_string())
    }
}

impl From<tokio::task::JoinError> for KartografError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Generic(format!("background task failed: {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_errors_are_actionable() {
        let message = KartografError::TooManyTiles {
            count: 3000,
            max: 2500,
        }
        .to_string();
        assert!(message.contains("3000"));
        assert!(message.contains("reduce the zoom"));

        let message = KartografError::TooLarge {
            bytes: 700 * 1_048_576,
            max: 584 * 1_048_576,
        }
        .to_string();
        assert!(message.contains("700 MB"));
        assert!(message.contains("584 MB"));
    }
}
