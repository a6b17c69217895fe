use std::path::{Path as FsPath, PathBuf};

use serde::{Deserialize, Serialize};
use tiny_skia::{Path, PathBuilder, Pixmap, Rect};

use crate::color::Color;
use crate::decoded_image::DecodedImage;

/// Natural size of marker icons in pixels.
pub(crate) const ICON_SIZE: f32 = 24.0;

/// Icon of a point marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerIcon {
    /// Vector icon bundled with the crate.
    Builtin(BuiltinIcon),
    /// Raster icon loaded from a file.
    File(PathBuf),
}

/// Bundled icons.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinIcon {
    /// Filled circle.
    #[default]
    Circle,
    /// Filled square.
    Square,
    /// Triangle pointing up.
    Triangle,
    /// Five-pointed star.
    Star,
    /// Map pin.
    Pin,
}

impl BuiltinIcon {
    /// Path of the icon of the given size centered at the origin.
    pub(crate) fn path(&self, size: f32) -> Option<Path> {
        let r = size / 2.0;
        match self {
            BuiltinIcon::Circle => PathBuilder::from_circle(0.0, 0.0, r),
            BuiltinIcon::Square => Rect::from_xywh(-r, -r, size, size).map(PathBuilder::from_rect),
            BuiltinIcon::Triangle => {
                let mut builder = PathBuilder::new();
                builder.move_to(0.0, -r);
                builder.line_to(r, r);
                builder.line_to(-r, r);
                builder.close();
                builder.finish()
            }
            BuiltinIcon::Star => {
                let mut builder = PathBuilder::new();
                for i in 0..10 {
                    let radius = if i % 2 == 0 { r } else { r * 0.4 };
                    let angle = (i as f32 * 36.0 - 90.0).to_radians();
                    let (x, y) = (radius * angle.cos(), radius * angle.sin());
                    if i == 0 {
                        builder.move_to(x, y);
                    } else {
                        builder.line_to(x, y);
                    }
                }
                builder.close();
                builder.finish()
            }
            BuiltinIcon::Pin => {
                let mut builder = PathBuilder::new();
                builder.move_to(0.0, r);
                builder.cubic_to(-r * 0.2, r * 0.3, -r * 0.75, 0.0, -r * 0.75, -r * 0.3);
                builder.cubic_to(-r * 0.75, -r * 0.8, -r * 0.4, -r, 0.0, -r);
                builder.cubic_to(r * 0.4, -r, r * 0.75, -r * 0.8, r * 0.75, -r * 0.3);
                builder.cubic_to(r * 0.75, 0.0, r * 0.2, r * 0.3, 0.0, r);
                builder.close();
                builder.finish()
            }
        }
    }
}

/// Loads a raster icon, replacing the color of every pixel with `tint` but keeping its alpha.
pub(crate) fn load_icon(path: &FsPath, tint: Option<Color>) -> Option<Pixmap> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            log::warn!("Failed to read marker icon {path:?}: {err}");
            return None;
        }
    };

    let mut image = match DecodedImage::new(&bytes) {
        Ok(image) => image.into_rgba(),
        Err(err) => {
            log::warn!("Failed to decode marker icon {path:?}: {err}");
            return None;
        }
    };

    if let Some(tint) = tint {
        for pixel in image.pixels_mut() {
            let alpha = (pixel.0[3] as u32 * tint.a() as u32 / 255) as u8;
            pixel.0 = [tint.r(), tint.g(), tint.b(), alpha];
        }
    }

    DecodedImage::from_rgba(image).to_pixmap()
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::*;

    #[test]
    fn builtin_icons_have_paths() {
        for icon in [
            BuiltinIcon::Circle,
            BuiltinIcon::Square,
            BuiltinIcon::Triangle,
            BuiltinIcon::Star,
            BuiltinIcon::Pin,
        ] {
            let path = icon.path(24.0).unwrap();
            let bounds = path.bounds();
            assert!(bounds.width() <= 24.01, "{icon:?}");
            assert!(bounds.height() <= 24.01, "{icon:?}");
            assert!(bounds.width() > 10.0, "{icon:?}");
        }
    }

    #[test]
    fn file_icon_is_tinted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icon.png");
        RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]))
            .save(&path)
            .unwrap();

        let pixmap = load_icon(&path, Some(Color::BLUE)).unwrap();
        let pixel = pixmap.pixel(1, 1).unwrap().demultiply();
        assert_eq!(
            [pixel.red(), pixel.green(), pixel.blue(), pixel.alpha()],
            [0, 0, 255, 255]
        );
    }

    #[test]
    fn missing_icon() {
        assert!(load_icon(FsPath::new("/nonexistent/icon.png"), None).is_none());
    }
}
