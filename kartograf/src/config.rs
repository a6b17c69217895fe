//! Configuration of map forming.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::acquisition::{DEFAULT_CHUNK_SIZE, DEFAULT_TILE_QUALITY};
use crate::color::Color;
use crate::error::KartografError;
use crate::overlay::ColorOverrides;
use crate::tile_schema::{AcquisitionLimits, DEFAULT_TILE_SIZE};

/// Default distance between samples of curved grid lines.
pub const DEFAULT_SAMPLE_STEP_M: f64 = 1000.0;

/// Parameters of [`MapFormer`](crate::MapFormer).
///
/// Every field has a default, so a configuration file only needs the values that differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapFormConfig {
    /// Request size limits, checked before anything is fetched.
    pub limits: AcquisitionLimits,
    /// Number of tiles fetched concurrently per group of sources.
    pub chunk_size: usize,
    /// Size of a tile in the formed map.
    pub tile_size: u32,
    /// Quality of temporary tiles. At 100 they are stored without loss.
    pub tile_quality: u8,
    /// Text stamped in the corner of the map.
    pub watermark: Option<String>,
    /// Geodetic grid in degrees.
    pub grid: Option<GridConfig>,
    /// SK-42 kilometre grid.
    pub sk42_grid: Option<Sk42GridConfig>,
    /// Colors replacing the colors of overlay objects.
    pub color_overrides: ColorOverrides,
}

impl Default for MapFormConfig {
    fn default() -> Self {
        Self {
            limits: AcquisitionLimits::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            tile_size: DEFAULT_TILE_SIZE,
            tile_quality: DEFAULT_TILE_QUALITY,
            watermark: Some("kartograf".to_string()),
            grid: None,
            sk42_grid: None,
            color_overrides: ColorOverrides::default(),
        }
    }
}

impl MapFormConfig {
    /// Parses the configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, KartografError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads the configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KartografError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

/// Geodetic grid parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Distance between grid lines in degrees.
    pub step_deg: f64,
    /// Step the first grid line is snapped to. Defaults to `step_deg`.
    pub rounding_step: Option<f64>,
    /// Distance between sample points of a line, meters.
    pub sample_step_m: f64,
    /// Color of lines and labels.
    pub color: Color,
    /// Line width at the reference resolution.
    pub stroke_width: f32,
    /// Label font size at the reference resolution.
    pub label_size: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            step_deg: 0.1,
            rounding_step: None,
            sample_step_m: DEFAULT_SAMPLE_STEP_M,
            color: Color::rgba(0, 0, 0, 200),
            stroke_width: 1.5,
            label_size: 12.0,
        }
    }
}

impl GridConfig {
    /// Step the first grid line is snapped to.
    pub fn rounding_step(&self) -> f64 {
        self.rounding_step.unwrap_or(self.step_deg)
    }
}

/// SK-42 grid parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sk42GridConfig {
    /// Distance between grid lines, meters.
    pub step_m: f64,
    /// Distance between sample points of a line, meters.
    pub sample_step_m: f64,
    /// Color of lines and labels.
    pub color: Color,
    /// Line width at the reference resolution.
    pub stroke_width: f32,
    /// Label font size at the reference resolution.
    pub label_size: f32,
}

impl Default for Sk42GridConfig {
    fn default() -> Self {
        Self {
            step_m: 1000.0,
            sample_step_m: DEFAULT_SAMPLE_STEP_M,
            color: Color::rgba(128, 0, 128, 200),
            stroke_width: 1.0,
            label_size: 11.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn defaults() {
        let config = MapFormConfig::from_json("{}").unwrap();
        assert_eq!(config, MapFormConfig::default());
        assert_eq!(config.limits.max_tiles, 2500);
        assert_eq!(config.limits.max_bytes, 612_368_384);
        assert_eq!(config.chunk_size, 10);
        assert_eq!(config.tile_size, 256);
        assert_eq!(config.tile_quality, 100);
    }

    #[test]
    fn partial_config() {
        let config = MapFormConfig::from_json(
            r##"{
                "limits": {"max_tiles": 100},
                "watermark": null,
                "grid": {"step_deg": 0.05, "rounding_step": 0.01, "color": "#FF000080"},
                "color_overrides": {"line": "#00FF00"}
            }"##,
        )
        .unwrap();

        assert_eq!(config.limits.max_tiles, 100);
        assert_eq!(config.limits.max_bytes, 612_368_384);
        assert_eq!(config.watermark, None);
        let grid = config.grid.unwrap();
        assert_eq!(grid.rounding_step(), 0.01);
        assert_eq!(grid.sample_step_m, 1000.0);
        assert_eq!(grid.color, Color::rgba(255, 0, 0, 128));
        assert_eq!(config.color_overrides.line, Some(Color::GREEN));
    }

    #[test]
    fn rounding_step_defaults_to_grid_step() {
        let grid = GridConfig {
            step_deg: 0.25,
            ..Default::default()
        };
        assert_eq!(grid.rounding_step(), 0.25);
    }

    #[test]
    fn invalid_json() {
        assert_matches!(
            MapFormConfig::from_json("{\"chunk_size\": \"ten\"}"),
            Err(KartografError::Serialization(_))
        );
    }
}
