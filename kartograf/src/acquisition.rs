//! Concurrent acquisition of the tiles of several map sources.
//!
//! Sources are split into a local and a remote group which are processed concurrently. Inside a
//! group the sources are processed one after another, and the tiles of a source are fetched in
//! chunks: all tiles of a chunk are loaded concurrently, and the next chunk starts only after the
//! previous one has settled. This keeps at most one chunk per group in flight.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::KartografError;
use crate::progress::{ProgressCounter, ProgressObserver};
use crate::source::{MapSource, SourceKind, TileSource};
use crate::store::{sanitize_file_name, TileStore};
use crate::tile_schema::{TileIndex, TileSchema};

/// Default number of tiles fetched concurrently per group.
pub const DEFAULT_CHUNK_SIZE: usize = 10;
/// Default quality of temporary tiles, which keeps them lossless.
pub const DEFAULT_TILE_QUALITY: u8 = crate::store::LOSSLESS_QUALITY;

const MAX_KEY_LENGTH: usize = 64;

/// A tile saved to the tile store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedTile {
    /// Index of the tile in the numbering of the source's schema.
    pub index: TileIndex,
    /// Path of the saved image.
    pub path: PathBuf,
    /// Alpha that was applied to the tile.
    pub alpha: u8,
}

/// Acquisition result of one map source.
#[derive(Debug, Clone)]
pub struct SourceTiles {
    /// The source.
    pub source: MapSource,
    /// Schema the source's tiles were fetched in.
    pub schema: TileSchema,
    /// Saved tiles in the order of the requested indices. `None` marks tiles that failed.
    pub tiles: Vec<Option<FetchedTile>>,
}

impl SourceTiles {
    /// Paths of all saved tiles.
    pub fn saved_paths(&self) -> impl Iterator<Item = &Path> {
        self.tiles.iter().flatten().map(|tile| tile.path.as_path())
    }

    /// Number of tiles that could not be acquired.
    pub fn missing_count(&self) -> usize {
        self.tiles.iter().filter(|tile| tile.is_none()).count()
    }
}

/// Tile acquisition pipeline.
///
/// Every instance owns its cancellation scope. Once cancelled, the instance stays cancelled.
pub struct TileAcquisition {
    store: Arc<dyn TileStore>,
    chunk_size: usize,
    quality: u8,
    cancellation: CancellationToken,
    progress: Option<Arc<dyn ProgressObserver>>,
}

impl TileAcquisition {
    /// Creates a new pipeline saving tiles to the store.
    pub fn new(store: Arc<dyn TileStore>) -> Self {
        Self {
            store,
            chunk_size: DEFAULT_CHUNK_SIZE,
            quality: DEFAULT_TILE_QUALITY,
            cancellation: CancellationToken::new(),
            progress: None,
        }
    }

    /// Sets the number of tiles fetched concurrently.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Sets the quality of lossy encoded tiles.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Uses the given cancellation token instead of an own one.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Sets the progress observer.
    pub fn with_progress(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.progress = Some(observer);
        self
    }

    /// Token cancelling this pipeline.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Cancels the acquisition.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Fetches and saves `tiles` (XYZ indices) of every visible source.
    ///
    /// Failed tiles are logged and recorded as `None`. The result is in the order of `sources`,
    /// hidden sources are left out. On cancellation all saved tiles are removed and
    /// [`KartografError::Cancelled`] is returned.
    pub async fn acquire(
        &self,
        sources: &[MapSource],
        tiles: &[TileIndex],
    ) -> Result<Vec<SourceTiles>, KartografError> {
        if self.cancellation.is_cancelled() {
            return Err(KartografError::Cancelled);
        }

        let mut local = vec![];
        let mut remote = vec![];
        for (ordinal, source) in sources.iter().enumerate() {
            if !source.visible() {
                continue;
            }

            match source.kind() {
                SourceKind::Local => local.push((ordinal, source)),
                SourceKind::Remote => remote.push((ordinal, source)),
            }
        }

        log::info!(
            "Acquiring {} tiles from {} local and {} remote sources",
            tiles.len(),
            local.len(),
            remote.len()
        );

        let counter = ProgressCounter::new(self.progress.clone());
        let (local, remote) = futures::join!(
            self.acquire_group(&local, tiles, &counter),
            self.acquire_group(&remote, tiles, &counter)
        );

        let mut acquired: Vec<_> = local.into_iter().chain(remote).collect();
        acquired.sort_by_key(|(ordinal, _)| *ordinal);
        let acquired: Vec<_> = acquired.into_iter().map(|(_, tiles)| tiles).collect();

        if self.cancellation.is_cancelled() {
            log::info!("Tile acquisition cancelled, removing saved tiles");
            remove_tiles(self.store.as_ref(), &acquired).await;
            return Err(KartografError::Cancelled);
        }

        let missing: usize = acquired.iter().map(SourceTiles::missing_count).sum();
        log::info!(
            "Tile acquisition finished, {} tiles processed, {missing} missing",
            counter.completed()
        );

        Ok(acquired)
    }

    async fn acquire_group(
        &self,
        sources: &[(usize, &MapSource)],
        tiles: &[TileIndex],
        counter: &ProgressCounter,
    ) -> Vec<(usize, SourceTiles)> {
        let mut result = vec![];
        for (ordinal, source) in sources {
            if self.cancellation.is_cancelled() {
                break;
            }

            let schema = source.resolve_schema().await;
            log::debug!("Source {} resolved to {schema:?}", source.name());

            let key = source_key(*ordinal, source.tile_source().key());
            let mut fetched = Vec::with_capacity(tiles.len());
            for chunk in tiles.chunks(self.chunk_size) {
                if self.cancellation.is_cancelled() {
                    break;
                }

                fetched.extend(self.acquire_chunk(source, schema, &key, chunk).await);
                counter.advance(chunk.len());
                log::debug!(
                    "Source {}: {} of {} tiles processed",
                    source.name(),
                    fetched.len(),
                    tiles.len()
                );
            }

            // Tiles of an interrupted source are reported as missing so that the list stays
            // aligned with the requested indices.
            fetched.resize(tiles.len(), None);
            result.push((
                *ordinal,
                SourceTiles {
                    source: (*source).clone(),
                    schema,
                    tiles: fetched,
                },
            ));
        }

        result
    }

    async fn acquire_chunk(
        &self,
        source: &MapSource,
        schema: TileSchema,
        key: &str,
        chunk: &[TileIndex],
    ) -> Vec<Option<FetchedTile>> {
        let mut join_set = JoinSet::new();
        for (position, index) in chunk.iter().enumerate() {
            let Some(index) = index.in_schema(schema) else {
                log::warn!("Tile {index:?} is outside of the tile grid");
                continue;
            };
            let task = TileTask {
                tile_source: source.tile_source().clone(),
                store: self.store.clone(),
                cancellation: self.cancellation.clone(),
                name: format!("{key}_{}_{}_{}", index.x, index.y, index.z),
                index,
                schema,
                alpha: source.alpha(),
                quality: self.quality,
            };

            join_set.spawn(async move { (position, task.run().await) });
        }

        let mut fetched = vec![None; chunk.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((position, Ok(tile))) => fetched[position] = Some(tile),
                Ok((_, Err(KartografError::Cancelled))) => {}
                Ok((position, Err(err))) => {
                    log::warn!(
                        "Failed to acquire tile {:?} of source {}: {err}",
                        chunk[position],
                        source.name()
                    );
                }
                Err(err) => log::warn!("Tile task of source {} failed: {err}", source.name()),
            }
        }

        fetched
    }
}

struct TileTask {
    tile_source: Arc<dyn TileSource>,
    store: Arc<dyn TileStore>,
    cancellation: CancellationToken,
    name: String,
    index: TileIndex,
    schema: TileSchema,
    alpha: u8,
    quality: u8,
}

impl TileTask {
    async fn run(self) -> Result<FetchedTile, KartografError> {
        let bytes = tokio::select! {
            _ = self.cancellation.cancelled() => return Err(KartografError::Cancelled),
            bytes = self.tile_source.fetch_tile(self.index, self.schema) => bytes?,
        };

        if self.cancellation.is_cancelled() {
            return Err(KartografError::Cancelled);
        }

        let path = self
            .store
            .save_image(bytes, &self.name, self.alpha, self.quality)
            .await?;

        if self.cancellation.is_cancelled() {
            self.store.remove(&path).await;
            return Err(KartografError::Cancelled);
        }

        Ok(FetchedTile {
            index: self.index,
            path,
            alpha: self.alpha,
        })
    }
}

fn source_key(ordinal: usize, key: &str) -> String {
    let sanitized = sanitize_file_name(key);
    let start = sanitized.len().saturating_sub(MAX_KEY_LENGTH);
    format!("{ordinal}_{}", &sanitized[start..])
}

/// Removes every saved tile of the acquisition results.
pub async fn remove_tiles(store: &dyn TileStore, acquired: &[SourceTiles]) {
    for path in acquired.iter().flat_map(SourceTiles::saved_paths) {
        store.remove(path).await;
    }
}
