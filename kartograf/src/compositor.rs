//! Merging of acquired tiles into one raster.

use tiny_skia::{FilterQuality, Pixmap, PixmapPaint, Transform};
use tokio_util::sync::CancellationToken;

use crate::acquisition::SourceTiles;
use crate::color::Color;
use crate::error::KartografError;
use crate::store::TileStore;
use crate::text::{HorizontalAlignment, TextRasterizer, TextStyle, VerticalAlignment};
use crate::tile_schema::TileRange;

/// Font size of the watermark relative to the raster width.
const WATERMARK_SIZE_RATIO: f32 = 0.015;
const MIN_WATERMARK_SIZE: f32 = 10.0;

/// Builds the mosaic of a tile range from the tiles of several sources.
pub struct Compositor<'a> {
    store: &'a dyn TileStore,
    tile_size: u32,
    cancellation: CancellationToken,
}

impl<'a> Compositor<'a> {
    /// Creates a compositor loading tiles from the store and placing them as `tile_size` squares.
    pub fn new(store: &'a dyn TileStore, tile_size: u32) -> Self {
        Self {
            store,
            tile_size,
            cancellation: CancellationToken::new(),
        }
    }

    /// Stops compositing with [`KartografError::Cancelled`] once the token is cancelled.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Allocates a transparent canvas for the range.
    pub fn allocate(&self, range: &TileRange) -> Result<Pixmap, KartografError> {
        let (width, height) = range.pixel_size(self.tile_size);
        Pixmap::new(width, height).ok_or(KartografError::CanvasAllocation { width, height })
    }

    /// Draws the tiles of all sources onto a new canvas.
    ///
    /// Sources are drawn in ascending z-order with source-over blending, so sources with bigger
    /// z-order cover the lower ones. Missing tiles and tiles outside the range are skipped.
    pub async fn composite(
        &self,
        range: &TileRange,
        sources: &[SourceTiles],
    ) -> Result<Pixmap, KartografError> {
        let mut canvas = self.allocate(range)?;
        log::info!(
            "Compositing {} sources onto a {}x{} canvas",
            sources.len(),
            canvas.width(),
            canvas.height()
        );

        let mut ordered: Vec<_> = sources.iter().collect();
        ordered.sort_by_key(|source| source.source.z_order());

        for source in ordered {
            for tile in source.tiles.iter().flatten() {
                if self.cancellation.is_cancelled() {
                    log::info!("Compositing is cancelled");
                    return Err(KartografError::Cancelled);
                }

                let Some(xyz) = tile.index.to_xyz(source.schema) else {
                    log::debug!("Tile {:?} is outside of the tile grid", tile.index);
                    continue;
                };
                let Some((x, y)) = range.pixel_offset(&xyz, self.tile_size) else {
                    log::debug!("Tile {xyz:?} is outside of the range {range:?}");
                    continue;
                };

                let image = match self.store.load_image(&tile.path).await {
                    Ok(image) => image,
                    Err(err) => {
                        log::warn!("Failed to load tile {:?}: {err}", tile.path);
                        continue;
                    }
                };

                let Some(tile_pixmap) = image.to_pixmap() else {
                    continue;
                };

                self.draw_tile(&mut canvas, &tile_pixmap, x, y);
            }
        }

        Ok(canvas)
    }

    fn draw_tile(&self, canvas: &mut Pixmap, tile: &Pixmap, x: u32, y: u32) {
        let scale_x = self.tile_size as f32 / tile.width() as f32;
        let scale_y = self.tile_size as f32 / tile.height() as f32;
        let paint = if scale_x == 1.0 && scale_y == 1.0 {
            PixmapPaint::default()
        } else {
            PixmapPaint {
                quality: FilterQuality::Bicubic,
                ..PixmapPaint::default()
            }
        };

        let transform = Transform::from_row(scale_x, 0.0, 0.0, scale_y, x as f32, y as f32);
        canvas.draw_pixmap(0, 0, tile.as_ref(), &paint, transform, None);
    }
}

/// Stamps the text in the bottom-right corner with a font size proportional to the canvas width.
///
/// The text is drawn over a shadow of the contrasting color, so it stays readable over any
/// imagery.
pub fn stamp_watermark(canvas: &mut Pixmap, text: &str, rasterizer: &TextRasterizer) {
    if text.is_empty() {
        return;
    }

    let font_size = (canvas.width() as f32 * WATERMARK_SIZE_RATIO).max(MIN_WATERMARK_SIZE);
    let margin = font_size / 2.0;
    let shadow_offset = (font_size / 12.0).max(1.0);
    let position = (
        canvas.width() as f32 - margin,
        canvas.height() as f32 - margin,
    );

    let color = Color::WHITE.with_alpha(220);
    let style = TextStyle::new(font_size)
        .with_alignment(HorizontalAlignment::Right, VerticalAlignment::Bottom);

    rasterizer.draw(
        canvas,
        text,
        (position.0 + shadow_offset, position.1 + shadow_offset),
        0.0,
        &style.clone().with_color(color.contrasting().with_alpha(160)),
    );
    rasterizer.draw(canvas, text, position, 0.0, &style.with_color(color));
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use image::{Rgba, RgbaImage};
    use kartograf_types::geo::BoundingBox;

    use super::*;
    use crate::acquisition::{FetchedTile, TileAcquisition};
    use crate::source::tests::SolidTileSource;
    use crate::source::MapSource;
    use crate::store::FileTileStore;
    use crate::tile_schema::{TileIndex, TileSchema};

    fn pixel(pixmap: &Pixmap, x: u32, y: u32) -> [u8; 4] {
        let p = pixmap.pixel(x, y).unwrap().demultiply();
        [p.red(), p.green(), p.blue(), p.alpha()]
    }

    fn save_tile(dir: &std::path::Path, name: &str, color: [u8; 4], size: u32) -> std::path::PathBuf {
        let path = dir.join(format!("{name}.png"));
        RgbaImage::from_pixel(size, size, Rgba(color))
            .save(&path)
            .unwrap();
        path
    }

    fn range() -> TileRange {
        // Tiles x 149..150, y 86..87 at zoom 8.
        let bbox = BoundingBox::new(50.5, 49.5, 31.5, 30.5).unwrap();
        let range = TileRange::from_bbox(&bbox, 8).unwrap();
        assert_eq!((range.x_min(), range.y_min(), range.columns(), range.rows()), (149, 86, 2, 2));
        range
    }

    #[tokio::test]
    async fn tms_and_xyz_tiles_land_in_the_same_place() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTileStore::new(dir.path()).unwrap();
        let range = range();

        let xyz_index = TileIndex::new(150, 87, 8);
        let tms_index = xyz_index.in_schema(TileSchema::Tms).unwrap();
        assert_ne!(xyz_index, tms_index);

        let as_source = |name: &str, schema, index, color| SourceTiles {
            source: MapSource::new(name, Arc::new(SolidTileSource::new(name, [0; 4]))),
            schema,
            tiles: vec![Some(FetchedTile {
                index,
                path: save_tile(dir.path(), name, color, 256),
                alpha: 255,
            })],
        };

        let compositor = Compositor::new(&store, 256);
        let xyz = compositor
            .composite(&range, &[as_source("xyz", TileSchema::Xyz, xyz_index, [255, 0, 0, 255])])
            .await
            .unwrap();
        let tms = compositor
            .composite(&range, &[as_source("tms", TileSchema::Tms, tms_index, [255, 0, 0, 255])])
            .await
            .unwrap();

        assert_eq!(xyz.data(), tms.data());
        assert_eq!(pixel(&xyz, 256 + 10, 256 + 10), [255, 0, 0, 255]);
        assert_eq!(pixel(&xyz, 10, 10)[3], 0);
    }

    #[tokio::test]
    async fn z_order_decides_what_is_on_top() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTileStore::new(dir.path()).unwrap();
        let range = range();
        let index = TileIndex::new(149, 86, 8);

        let source = |name: &str, z_order, color| SourceTiles {
            source: MapSource::new(name, Arc::new(SolidTileSource::new(name, [0; 4])))
                .with_z_order(z_order),
            schema: TileSchema::Xyz,
            tiles: vec![Some(FetchedTile {
                index,
                path: save_tile(dir.path(), name, color, 256),
                alpha: 255,
            }), None],
        };

        let compositor = Compositor::new(&store, 256);
        let canvas = compositor
            .composite(
                &range,
                &[
                    source("top", 5, [0, 0, 255, 255]),
                    source("bottom", 1, [0, 255, 0, 255]),
                ],
            )
            .await
            .unwrap();
        assert_eq!(pixel(&canvas, 100, 100), [0, 0, 255, 255]);
    }

    #[tokio::test]
    async fn translucent_source_blends() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileTileStore::new(dir.path()).unwrap());
        let range = range();
        let tiles: Vec<_> = range.iter().collect();

        let sources = vec![
            MapSource::new("base", Arc::new(SolidTileSource::new("base", [0, 0, 0, 255]))),
            MapSource::new("over", Arc::new(SolidTileSource::new("over", [255, 255, 255, 255])))
                .with_alpha(128)
                .with_z_order(1),
        ];
        let acquired = TileAcquisition::new(store.clone())
            .acquire(&sources, &tiles)
            .await
            .unwrap();

        let canvas = Compositor::new(store.as_ref(), 256)
            .composite(&range, &acquired)
            .await
            .unwrap();
        let [r, g, b, a] = pixel(&canvas, 300, 300);
        assert_eq!(a, 255);
        assert!((120..=136).contains(&r));
        assert_eq!((r, r), (g, b));
    }

    #[tokio::test]
    async fn cancelled_compositing_stops() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTileStore::new(dir.path()).unwrap();
        let range = range();
        let tiles = SourceTiles {
            source: MapSource::new("base", Arc::new(SolidTileSource::new("base", [0; 4]))),
            schema: TileSchema::Xyz,
            tiles: vec![Some(FetchedTile {
                index: TileIndex::new(149, 86, 8),
                path: save_tile(dir.path(), "base", [1, 2, 3, 255], 256),
                alpha: 255,
            })],
        };

        let cancellation = CancellationToken::new();
        cancellation.cancel();
        let result = Compositor::new(&store, 256)
            .with_cancellation(cancellation)
            .composite(&range, &[tiles])
            .await;
        assert_matches!(result, Err(KartografError::Cancelled));
    }

    #[tokio::test]
    async fn small_tiles_are_scaled() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTileStore::new(dir.path()).unwrap();
        let range = range();
        let tiles = SourceTiles {
            source: MapSource::new("small", Arc::new(SolidTileSource::new("small", [0; 4]))),
            schema: TileSchema::Xyz,
            tiles: vec![Some(FetchedTile {
                index: TileIndex::new(149, 86, 8),
                path: save_tile(dir.path(), "small", [9, 9, 9, 255], 128),
                alpha: 255,
            })],
        };

        let canvas = Compositor::new(&store, 256)
            .composite(&range, &[tiles])
            .await
            .unwrap();
        let [r, _, _, a] = pixel(&canvas, 128, 128);
        assert!((8..=10).contains(&r));
        assert!(a > 250);
        assert_eq!(pixel(&canvas, 300, 300)[3], 0);
    }

    #[test]
    fn watermark_without_font_is_noop() {
        let mut canvas = Pixmap::new(64, 64).unwrap();
        stamp_watermark(&mut canvas, "kartograf", &TextRasterizer::without_font());
        assert!(canvas.pixels().iter().all(|p| p.alpha() == 0));
    }

    #[test]
    fn watermark_with_system_font() {
        let rasterizer = TextRasterizer::system();
        if !rasterizer.has_font() {
            return;
        }

        let mut canvas = Pixmap::new(800, 200).unwrap();
        stamp_watermark(&mut canvas, "kartograf", &rasterizer);
        assert!(canvas.pixels().iter().any(|p| p.alpha() > 0));
        // Top-left corner stays untouched.
        assert_eq!(canvas.pixel(5, 5).unwrap().alpha(), 0);
    }
}
