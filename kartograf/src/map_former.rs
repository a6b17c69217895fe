//! End-to-end forming of a map image.

use std::sync::Arc;

use kartograf_types::geo::BoundingBox;
use serde::{Deserialize, Serialize};
use tiny_skia::Pixmap;
use tokio_util::sync::CancellationToken;

use crate::acquisition::{remove_tiles, SourceTiles, TileAcquisition};
use crate::compositor::{stamp_watermark, Compositor};
use crate::config::MapFormConfig;
use crate::decoded_image::DecodedImage;
use crate::error::KartografError;
use crate::overlay::{geodetic_grid_lines, sk42_grid_lines, Layer, OverlayRenderer};
use crate::progress::ProgressObserver;
use crate::source::MapSource;
use crate::state::{FormStage, FormedMap, MapFormState, StateObserver};
use crate::store::TileStore;
use crate::text::TextRasterizer;
use crate::tile_schema::{check_limits, estimate_byte_size, TileRange};

/// What map to form.
#[derive(Debug, Clone)]
pub struct MapFormRequest {
    /// Area of the map.
    pub bounding_box: BoundingBox,
    /// Zoom level of the tiles.
    pub zoom: u32,
    /// Tile sources in the order they were configured.
    pub sources: Vec<MapSource>,
    /// Overlays drawn over the imagery.
    pub layers: Vec<Layer>,
    /// File name of the map image without extension.
    pub output_name: String,
}

/// Size of a request, known before any tile is fetched.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preflight {
    /// Number of tiles per source.
    pub tile_count: u64,
    /// Uncompressed size of the tiles of one source.
    pub estimated_bytes: u64,
}

/// Forms map images: acquires tiles, composites them, draws overlays and saves the result.
///
/// Temporary tiles are removed from the store when forming finishes, whatever the outcome.
pub struct MapFormer {
    config: MapFormConfig,
    store: Arc<dyn TileStore>,
    text: Arc<TextRasterizer>,
    cancellation: CancellationToken,
    progress: Option<Arc<dyn ProgressObserver>>,
    state_observer: Option<Arc<dyn StateObserver>>,
}

impl MapFormer {
    /// Creates a former writing into the store and drawing text with a system font.
    pub fn new(config: MapFormConfig, store: Arc<dyn TileStore>) -> Self {
        Self {
            config,
            store,
            text: Arc::new(TextRasterizer::system()),
            cancellation: CancellationToken::new(),
            progress: None,
            state_observer: None,
        }
    }

    /// Uses the rasterizer for labels and the watermark.
    pub fn with_text_rasterizer(mut self, text: TextRasterizer) -> Self {
        self.text = Arc::new(text);
        self
    }

    /// Reports the number of acquired tiles to the observer.
    pub fn with_progress(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.progress = Some(observer);
        self
    }

    /// Reports every change of the state record to the observer.
    pub fn with_state_observer(mut self, observer: Arc<dyn StateObserver>) -> Self {
        self.state_observer = Some(observer);
        self
    }

    /// Token cancelling the forming.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Cancels the forming. Already saved tiles are removed.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Configuration of the former.
    pub fn config(&self) -> &MapFormConfig {
        &self.config
    }

    /// Counts the tiles of the request and checks them against the limits.
    pub fn preflight(&self, bbox: &BoundingBox, zoom: u32) -> Result<Preflight, KartografError> {
        let range = TileRange::from_bbox(bbox, zoom)?;
        let tile_count = check_limits(&range, self.config.tile_size, &self.config.limits)?;
        Ok(Preflight {
            tile_count,
            estimated_bytes: estimate_byte_size(tile_count, self.config.tile_size),
        })
    }

    /// Forms the map and saves it to the store.
    pub async fn form_map(&self, request: &MapFormRequest) -> Result<FormedMap, KartografError> {
        match self.run(request).await {
            Ok(map) => {
                log::info!("Map {:?} is formed", map.path);
                self.report(MapFormState::done(map.clone()));
                Ok(map)
            }
            Err(err) => {
                log::error!("Failed to form map {}: {err}", request.output_name);
                self.report(MapFormState::failed(&err));
                Err(err)
            }
        }
    }

    async fn run(&self, request: &MapFormRequest) -> Result<FormedMap, KartografError> {
        self.report_stage(FormStage::Counting, 0);
        let sources = select_sources(&request.sources, request.zoom)?;
        let range = TileRange::from_bbox(&request.bounding_box, request.zoom)?;
        let tile_count = check_limits(&range, self.config.tile_size, &self.config.limits)?;
        log::info!(
            "Forming map {} from {tile_count} tiles of {} sources at zoom {}",
            request.output_name,
            sources.len(),
            request.zoom
        );

        self.report_stage(FormStage::Downloading, 0);
        let tiles: Vec<_> = range.iter().collect();
        let download_progress = DownloadProgress {
            total: tiles.len() * sources.len(),
            user: self.progress.clone(),
            state: self.state_observer.clone(),
        };
        let acquisition = TileAcquisition::new(self.store.clone())
            .with_chunk_size(self.config.chunk_size)
            .with_quality(self.config.tile_quality)
            .with_cancellation(self.cancellation.clone())
            .with_progress(Arc::new(download_progress));
        let acquired = acquisition.acquire(&sources, &tiles).await?;

        let canvas = self.composite(&range, &acquired).await;
        remove_tiles(self.store.as_ref(), &acquired).await;
        let canvas = canvas?;

        self.report_stage(FormStage::Drawing, 0);
        let bounding_box = range.bounding_box()?;
        let canvas = {
            let config = self.config.clone();
            let text = self.text.clone();
            let layers = request.layers.clone();
            let mut canvas = canvas;
            tokio::task::spawn_blocking(move || {
                draw_overlays(&mut canvas, &bounding_box, &layers, &config, &text);
                canvas
            })
            .await?
        };

        if self.cancellation.is_cancelled() {
            return Err(KartografError::Cancelled);
        }

        self.report_stage(FormStage::Saving, 0);
        let image = DecodedImage::from_pixmap(&canvas);
        let path = self.store.save_output(image, &request.output_name).await?;

        Ok(FormedMap {
            path,
            bounding_box,
            layers: request.layers.clone(),
        })
    }

    async fn composite(
        &self,
        range: &TileRange,
        acquired: &[SourceTiles],
    ) -> Result<Pixmap, KartografError> {
        if self.cancellation.is_cancelled() {
            return Err(KartografError::Cancelled);
        }

        self.report_stage(FormStage::Compositing, 0);
        Compositor::new(self.store.as_ref(), self.config.tile_size)
            .with_cancellation(self.cancellation.clone())
            .composite(range, acquired)
            .await
    }

    fn report_stage(&self, stage: FormStage, progress: u8) {
        self.report(MapFormState::in_stage(stage, progress));
    }

    fn report(&self, state: MapFormState) {
        if let Some(observer) = &self.state_observer {
            observer.on_state(&state);
        }
    }
}

/// Visible sources supporting the zoom level.
///
/// Fails if there are no visible sources or none of them supports the zoom.
fn select_sources(sources: &[MapSource], zoom: u32) -> Result<Vec<MapSource>, KartografError> {
    let visible: Vec<_> = sources.iter().filter(|source| source.visible()).collect();
    if visible.is_empty() {
        return Err(KartografError::Generic("no visible map sources".into()));
    }

    let mut selected = vec![];
    for source in visible {
        if source.supports_zoom(zoom) {
            selected.push(source.clone());
        } else {
            log::warn!(
                "Source {} supports zoom levels {}..={}, skipped at zoom {zoom}",
                source.name(),
                source.zoom_min(),
                source.zoom_max()
            );
        }
    }

    if selected.is_empty() {
        return Err(KartografError::InvalidZoom(zoom));
    }

    Ok(selected)
}

fn draw_overlays(
    canvas: &mut Pixmap,
    bbox: &BoundingBox,
    layers: &[Layer],
    config: &MapFormConfig,
    text: &TextRasterizer,
) {
    let Some(renderer) = OverlayRenderer::new(
        bbox,
        canvas.width(),
        canvas.height(),
        text,
        &config.color_overrides,
    ) else {
        log::warn!("Cannot draw overlays on a degenerate map {bbox:?}");
        return;
    };

    renderer.render_layers(canvas, layers);

    if let Some(grid) = &config.grid {
        let lines =
            geodetic_grid_lines(bbox, grid.step_deg, grid.rounding_step(), grid.sample_step_m);
        renderer.render_grid(canvas, &lines, grid.color, grid.stroke_width, grid.label_size);
    }

    if let Some(grid) = &config.sk42_grid {
        let lines = sk42_grid_lines(bbox, grid.step_m, grid.sample_step_m);
        renderer.render_grid(canvas, &lines, grid.color, grid.stroke_width, grid.label_size);
    }

    if let Some(watermark) = &config.watermark {
        stamp_watermark(canvas, watermark, text);
    }
}

/// Forwards acquisition progress to the user and to the state record.
struct DownloadProgress {
    total: usize,
    user: Option<Arc<dyn ProgressObserver>>,
    state: Option<Arc<dyn StateObserver>>,
}

impl ProgressObserver for DownloadProgress {
    fn on_progress(&self, completed: usize) {
        if let Some(user) = &self.user {
            user.on_progress(completed);
        }

        if let Some(state) = &self.state {
            let percent = (completed * 100).checked_div(self.total).unwrap_or(100);
            state.on_state(&MapFormState::in_stage(
                FormStage::Downloading,
                percent.min(100) as u8,
            ));
        }
    }
}
