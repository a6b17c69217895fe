use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;

use super::{SourceKind, TileSource};
use crate::error::KartografError;
use crate::tile_schema::{TileIndex, TileSchema};

/// Extensions of the tile files, in lookup order. Only formats the tile decoder supports.
const TILE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];
const TMS_MARKER_FILE: &str = "tilemapresource.xml";
const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Default, Deserialize)]
struct ArchiveMetadata {
    scheme: Option<String>,
}

/// Tiles stored in a directory tree as `{root}/{z}/{x}/{y}.{ext}`, where `ext` is `png`, `jpg`
/// or `jpeg`.
///
/// The archive is considered TMS if it contains a `tilemapresource.xml` file (as written by
/// `gdal2tiles`) or if its `metadata.json` states `"scheme": "tms"`. Otherwise it is XYZ.
#[derive(Debug, Clone)]
pub struct LocalTileArchive {
    root: PathBuf,
    key: String,
}

impl LocalTileArchive {
    /// Creates an archive reading tiles from the given folder.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let key = root.to_string_lossy().into_owned();
        Self { root, key }
    }

    /// Root folder of the archive.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn tile_path(&self, index: TileIndex, extension: &str) -> PathBuf {
        self.root
            .join(index.z.to_string())
            .join(index.x.to_string())
            .join(format!("{}.{extension}", index.y))
    }

    async fn read_metadata(&self) -> Option<ArchiveMetadata> {
        let bytes = tokio::fs::read(self.root.join(METADATA_FILE)).await.ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(metadata) => Some(metadata),
            Err(err) => {
                log::warn!("Invalid metadata file in {:?}: {err}", self.root);
                None
            }
        }
    }
}

#[async_trait]
impl TileSource for LocalTileArchive {
    fn kind(&self) -> SourceKind {
        SourceKind::Local
    }

    fn key(&self) -> &str {
        &self.key
    }

    async fn resolve_schema(&self) -> TileSchema {
        if tokio::fs::try_exists(self.root.join(TMS_MARKER_FILE))
            .await
            .unwrap_or(false)
        {
            return TileSchema::Tms;
        }

        let scheme = self.read_metadata().await.and_then(|m| m.scheme);
        match scheme.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("tms") => TileSchema::Tms,
            _ => TileSchema::Xyz,
        }
    }

    async fn fetch_tile(
        &self,
        index: TileIndex,
        _schema: TileSchema,
    ) -> Result<Bytes, KartografError> {
        for extension in TILE_EXTENSIONS {
            match tokio::fs::read(self.tile_path(index, extension)).await {
                Ok(bytes) => return Ok(bytes.into()),
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Err(KartografError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn write_tile(root: &Path, index: TileIndex, extension: &str, data: &[u8]) {
        let folder = root.join(index.z.to_string()).join(index.x.to_string());
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join(format!("{}.{extension}", index.y)), data).unwrap();
    }

    #[tokio::test]
    async fn reads_tiles_with_any_extension() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), TileIndex::new(1, 2, 3), "png", b"png");
        write_tile(dir.path(), TileIndex::new(2, 2, 3), "jpg", b"jpg");

        let archive = LocalTileArchive::new(dir.path());
        let png = archive
            .fetch_tile(TileIndex::new(1, 2, 3), TileSchema::Xyz)
            .await
            .unwrap();
        assert_eq!(png, Bytes::from_static(b"png"));
        let jpg = archive
            .fetch_tile(TileIndex::new(2, 2, 3), TileSchema::Xyz)
            .await
            .unwrap();
        assert_eq!(jpg, Bytes::from_static(b"jpg"));
        assert_matches!(
            archive
                .fetch_tile(TileIndex::new(3, 2, 3), TileSchema::Xyz)
                .await,
            Err(KartografError::NotFound)
        );
    }

    #[tokio::test]
    async fn undecodable_formats_are_not_read() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), TileIndex::new(1, 2, 3), "webp", b"webp");

        let archive = LocalTileArchive::new(dir.path());
        assert_matches!(
            archive
                .fetch_tile(TileIndex::new(1, 2, 3), TileSchema::Xyz)
                .await,
            Err(KartografError::NotFound)
        );

        write_tile(dir.path(), TileIndex::new(1, 2, 3), "jpeg", b"jpeg");
        let jpeg = archive
            .fetch_tile(TileIndex::new(1, 2, 3), TileSchema::Xyz)
            .await
            .unwrap();
        assert_eq!(jpeg, Bytes::from_static(b"jpeg"));
    }

    #[tokio::test]
    async fn schema_detection() {
        let dir = tempfile::tempdir().unwrap();
        let archive = LocalTileArchive::new(dir.path());
        assert_eq!(archive.resolve_schema().await, TileSchema::Xyz);

        std::fs::write(dir.path().join(METADATA_FILE), r#"{"scheme": "TMS", "name": "a"}"#)
            .unwrap();
        assert_eq!(archive.resolve_schema().await, TileSchema::Tms);

        std::fs::write(dir.path().join(METADATA_FILE), r#"{"scheme": "xyz"}"#).unwrap();
        assert_eq!(archive.resolve_schema().await, TileSchema::Xyz);

        std::fs::write(dir.path().join(TMS_MARKER_FILE), "<TileMap/>").unwrap();
        assert_eq!(archive.resolve_schema().await, TileSchema::Tms);
    }
}
