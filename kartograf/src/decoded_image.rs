//! Decoding, encoding and conversion of raster images.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, RgbaImage};
use tiny_skia::{IntSize, Pixmap};

use crate::error::KartografError;

/// An image that has been loaded into memory, with non-premultiplied RGBA pixels.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    image: RgbaImage,
}

impl DecodedImage {
    /// Decode an image from a byte slice.
    ///
    /// The format is guessed from the data. Non-RGBA images are converted to RGBA.
    pub fn new(bytes: &[u8]) -> Result<Self, KartografError> {
        let decoded = image::load_from_memory(bytes)?;
        Ok(Self {
            image: decoded.to_rgba8(),
        })
    }

    /// Wraps an RGBA image.
    pub fn from_rgba(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Width and height of the image.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Underlying RGBA image.
    pub fn as_rgba(&self) -> &RgbaImage {
        &self.image
    }

    /// Converts into the underlying RGBA image.
    pub fn into_rgba(self) -> RgbaImage {
        self.image
    }

    /// Multiplies the alpha channel of every pixel by `alpha / 255`.
    pub fn apply_alpha(&mut self, alpha: u8) {
        if alpha == u8::MAX {
            return;
        }

        for pixel in self.image.pixels_mut() {
            pixel.0[3] = ((pixel.0[3] as u32 * alpha as u32 + 127) / 255) as u8;
        }
    }

    /// Returns true if any pixel is not fully opaque.
    pub fn has_transparency(&self) -> bool {
        self.image.pixels().any(|p| p.0[3] < u8::MAX)
    }

    /// Encodes the image as PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>, KartografError> {
        let mut buffer = Cursor::new(Vec::new());
        PngEncoder::new(&mut buffer).write_image(
            self.image.as_raw(),
            self.image.width(),
            self.image.height(),
            ColorType::Rgba8,
        )?;
        Ok(buffer.into_inner())
    }

    /// Encodes the image as JPEG, dropping the alpha channel.
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>, KartografError> {
        let rgb = image::DynamicImage::ImageRgba8(self.image.clone()).to_rgb8();
        let mut buffer = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).encode(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ColorType::Rgb8,
        )?;
        Ok(buffer.into_inner())
    }

    /// Converts the image into a premultiplied pixmap.
    pub fn to_pixmap(&self) -> Option<Pixmap> {
        let size = IntSize::from_wh(self.image.width(), self.image.height())?;
        let data = self
            .image
            .pixels()
            .flat_map(|p| {
                let [r, g, b, a] = p.0;
                [premultiply(r, a), premultiply(g, a), premultiply(b, a), a]
            })
            .collect();
        Pixmap::from_vec(data, size)
    }

    /// Creates an image from a premultiplied pixmap.
    pub fn from_pixmap(pixmap: &Pixmap) -> Self {
        let data = pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();

        let image = RgbaImage::from_raw(pixmap.width(), pixmap.height(), data)
            .unwrap_or_else(|| RgbaImage::new(pixmap.width(), pixmap.height()));
        Self { image }
    }
}

fn premultiply(channel: u8, alpha: u8) -> u8 {
    ((channel as u32 * alpha as u32 + 127) / 255) as u8
}
