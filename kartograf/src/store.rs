//! Persistence of intermediate tiles and of the formed map.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::decoded_image::DecodedImage;
use crate::error::KartografError;

/// Storage for the images produced while forming a map.
#[async_trait]
pub trait TileStore: Send + Sync {
    /// Decodes the tile, applies `alpha` to it and saves it under `name`. Returns the path of the
    /// saved file. `quality` below [`LOSSLESS_QUALITY`] allows lossy encoding.
    async fn save_image(
        &self,
        bytes: Bytes,
        name: &str,
        alpha: u8,
        quality: u8,
    ) -> Result<PathBuf, KartografError>;

    /// Loads a previously saved image.
    async fn load_image(&self, path: &Path) -> Result<DecodedImage, KartografError>;

    /// Removes a previously saved image. Failures are only logged.
    async fn remove(&self, path: &Path);

    /// Saves the final map image under `name`.
    async fn save_output(
        &self,
        image: DecodedImage,
        name: &str,
    ) -> Result<PathBuf, KartografError>;
}

/// Quality at which tiles are stored without loss.
pub const LOSSLESS_QUALITY: u8 = 100;

/// Stores images as files in a working folder.
///
/// Tiles are written as PNG, so the compositor gets the pixels of the source unchanged. Only
/// opaque tiles saved with a quality below [`LOSSLESS_QUALITY`] are written as JPEG. The formed
/// map is always PNG.
#[derive(Debug, Clone)]
pub struct FileTileStore {
    folder: PathBuf,
}

impl FileTileStore {
    /// Creates a store in the folder, creating the folder if needed.
    pub fn new(folder: impl AsRef<Path>) -> Result<Self, KartografError> {
        std::fs::create_dir_all(folder.as_ref())?;
        Ok(Self {
            folder: folder.as_ref().to_path_buf(),
        })
    }

    /// Working folder of the store.
    pub fn folder(&self) -> &Path {
        &self.folder
    }
}

/// Replaces every character that is not safe in a file name.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl TileStore for FileTileStore {
    async fn save_image(
        &self,
        bytes: Bytes,
        name: &str,
        alpha: u8,
        quality: u8,
    ) -> Result<PathBuf, KartografError> {
        let folder = self.folder.clone();
        let name = sanitize_file_name(name);
        tokio::task::spawn_blocking(move || -> Result<_, KartografError> {
            let mut image = DecodedImage::new(&bytes)?;
            image.apply_alpha(alpha);

            // Names may contain dots, so the extension is appended rather than replaced.
            let (path, encoded) = if quality < LOSSLESS_QUALITY && !image.has_transparency() {
                (folder.join(format!("{name}.jpg")), image.encode_jpeg(quality)?)
            } else {
                (folder.join(format!("{name}.png")), image.encode_png()?)
            };

            std::fs::write(&path, encoded)?;
            Ok(path)
        })
        .await?
    }

    async fn load_image(&self, path: &Path) -> Result<DecodedImage, KartografError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || -> Result<_, KartografError> {
            let bytes = std::fs::read(path)?;
            DecodedImage::new(&bytes)
        })
        .await?
    }

    async fn remove(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => log::warn!("Failed to remove temporary file {path:?}: {err}"),
        }
    }

    async fn save_output(
        &self,
        image: DecodedImage,
        name: &str,
    ) -> Result<PathBuf, KartografError> {
        let path = self
            .folder
            .join(format!("{}.png", sanitize_file_name(name)));
        tokio::task::spawn_blocking(move || -> Result<_, KartografError> {
            std::fs::write(&path, image.encode_png()?)?;
            Ok(path)
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::*;
    use crate::source::tests::encode_png;

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(
            sanitize_file_name("https://a.b/{z}/{x}/{y}.png_1_2_3"),
            "https___a.b__z___x___y_.png_1_2_3"
        );
    }

    #[tokio::test]
    async fn lossless_tiles_keep_their_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTileStore::new(dir.path()).unwrap();
        let mut source = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 255, 255]));
        source.put_pixel(3, 5, Rgba([17, 201, 99, 255]));
        let tile = encode_png(&source);

        let path = store
            .save_image(tile, "opaque", 255, LOSSLESS_QUALITY)
            .await
            .unwrap();
        assert_eq!(path.extension().unwrap(), "png");

        let loaded = store.load_image(&path).await.unwrap();
        assert_eq!(loaded.as_rgba(), &source);
    }

    #[tokio::test]
    async fn opaque_tiles_become_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTileStore::new(dir.path()).unwrap();
        let tile = encode_png(&RgbaImage::from_pixel(4, 4, Rgba([0, 128, 0, 255])));

        let path = store.save_image(tile.clone(), "opaque", 255, 90).await.unwrap();
        assert_eq!(path.extension().unwrap(), "jpg");

        let path = store.save_image(tile, "faded", 100, 90).await.unwrap();
        assert_eq!(path.extension().unwrap(), "png");
        let loaded = store.load_image(&path).await.unwrap();
        assert_eq!(loaded.as_rgba().get_pixel(0, 0).0, [0, 128, 0, 100]);

        store.remove(&path).await;
        assert!(!path.exists());
        // Removing twice is not an error.
        store.remove(&path).await;
    }

    #[tokio::test]
    async fn names_with_dots_keep_their_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTileStore::new(dir.path()).unwrap();
        let tile = encode_png(&RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])));

        let first = store
            .save_image(tile.clone(), "0_tile.osm.org_1_2_3", 255, 90)
            .await
            .unwrap();
        let second = store
            .save_image(tile, "0_tile.osm.org_1_3_3", 255, 90)
            .await
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(first, dir.path().join("0_tile.osm.org_1_2_3.jpg"));
    }

    #[tokio::test]
    async fn broken_tile_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTileStore::new(dir.path()).unwrap();
        assert!(store
            .save_image(Bytes::from_static(b"garbage"), "broken", 255, 90)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn output_is_png() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTileStore::new(dir.path()).unwrap();
        let image = DecodedImage::from_rgba(RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255])));
        let path = store.save_output(image, "map").await.unwrap();
        assert_eq!(path, dir.path().join("map.png"));
        assert!(path.exists());
    }
}
