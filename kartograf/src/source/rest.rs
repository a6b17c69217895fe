use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use super::{FileCacheController, PersistentCacheController, SourceKind, TileSource};
use crate::error::KartografError;
use crate::tile_schema::{TileIndex, TileSchema};

const TMS_PREFIX: &str = "tms:";
const USER_AGENT: &str = concat!("kartograf/", env!("CARGO_PKG_VERSION"));

/// Tile source loading tiles one by one with HTTP GET requests.
///
/// The url template is expanded with `{x}`, `{y}` and `{z}` placeholders. `{-y}` is replaced with
/// the flipped row index, which is how OSGeo TMS servers are addressed with XYZ numbering. A
/// template prefixed with `tms:` is a TMS source, and `{y}` then receives the TMS row.
///
/// With a cache, tiles are loaded from the network only if they are not cached yet. In offline
/// mode the network is not used at all.
pub struct RestTileSource {
    template: String,
    schema: TileSchema,
    client: reqwest::Client,
    cache: Option<Arc<dyn PersistentCacheController<str, Bytes>>>,
    offline_mode: bool,
}

impl RestTileSource {
    /// Creates a new source for the url template.
    pub fn new(template: impl Into<String>) -> Result<Self, KartografError> {
        let template = template.into();
        let (schema, template) = match template.strip_prefix(TMS_PREFIX) {
            Some(stripped) => (TileSchema::Tms, stripped.to_string()),
            None => (TileSchema::Xyz, template),
        };

        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            template: template.replace("{-y}", "{inv_y}"),
            schema,
            client,
            cache: None,
            offline_mode: false,
        })
    }

    /// Stores loaded tiles in the file cache.
    pub fn with_cache(mut self, cache: FileCacheController) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    /// Only uses tiles from the cache.
    pub fn with_offline_mode(mut self, offline_mode: bool) -> Self {
        self.offline_mode = offline_mode;
        self
    }

    /// Url of the tile.
    pub fn url(&self, index: TileIndex) -> Result<String, KartografError> {
        let inv_y = kartograf_types::tile::flip_y(index.y, index.z).ok_or_else(|| {
            KartografError::Generic(format!("tile {index:?} is outside of the tile grid"))
        })?;
        let vars = HashMap::from([
            ("x".to_string(), index.x),
            ("y".to_string(), index.y),
            ("z".to_string(), index.z),
            ("inv_y".to_string(), inv_y),
        ]);

        strfmt::strfmt(&self.template, &vars)
            .map_err(|err| KartografError::Generic(format!("invalid url template: {err}")))
    }

    async fn read_cache(&self, url: &str) -> Option<Bytes> {
        let cache = self.cache.clone()?;
        let url = url.to_owned();
        match tokio::task::spawn_blocking(move || cache.get(&url)).await {
            Ok(data) => data,
            Err(err) => {
                log::warn!("Cache read task failed: {err}");
                None
            }
        }
    }

    async fn write_cache(&self, url: &str, data: &Bytes) {
        let Some(cache) = self.cache.clone() else {
            return;
        };

        let url = url.to_owned();
        let data = data.clone();
        let result = tokio::task::spawn_blocking(move || cache.insert(&url, &data)).await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => log::warn!("Failed to write persistent cache entry: {err}"),
            Err(err) => log::warn!("Cache write task failed: {err}"),
        }
    }

    async fn load_from_web(&self, url: &str) -> Result<Bytes, KartografError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(KartografError::Http(format!(
                "{url} responded with {}",
                response.status()
            )));
        }

        Ok(response.bytes().await?)
    }
}

#[async_trait]
impl TileSource for RestTileSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Remote
    }

    fn key(&self) -> &str {
        &self.template
    }

    async fn resolve_schema(&self) -> TileSchema {
        self.schema
    }

    async fn fetch_tile(
        &self,
        index: TileIndex,
        _schema: TileSchema,
    ) -> Result<Bytes, KartografError> {
        let url = self.url(index)?;

        if let Some(data) = self.read_cache(&url).await {
            return Ok(data);
        }

        if self.offline_mode {
            return Err(KartografError::NotFound);
        }

        log::debug!("Loading {url}");
        let data = self.load_from_web(&url).await?;

        self.write_cache(&url, &data).await;

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn url_expansion() {
        let source = RestTileSource::new("https://tile.osm.org/{z}/{x}/{y}.png").unwrap();
        assert_eq!(
            source.url(TileIndex::new(150, 84, 8)).unwrap(),
            "https://tile.osm.org/8/150/84.png"
        );

        let source = RestTileSource::new("https://tms.example.com/{z}/{x}/{-y}.png").unwrap();
        assert_eq!(
            source.url(TileIndex::new(150, 84, 8)).unwrap(),
            "https://tms.example.com/8/150/171.png"
        );
    }

    #[tokio::test]
    async fn tms_prefix() {
        let source = RestTileSource::new("tms:https://tms.example.com/{z}/{x}/{y}.png").unwrap();
        assert_eq!(source.resolve_schema().await, TileSchema::Tms);
        assert_eq!(
            source.url(TileIndex::new(1, 0, 1)).unwrap(),
            "https://tms.example.com/1/1/0.png"
        );

        let source = RestTileSource::new("https://a.b/{z}/{x}/{-y}.png").unwrap();
        assert_eq!(source.resolve_schema().await, TileSchema::Xyz);
    }

    #[test]
    fn invalid_template() {
        let source = RestTileSource::new("https://a.b/{z}/{x}/{row}.png").unwrap();
        assert_matches!(
            source.url(TileIndex::new(0, 0, 0)),
            Err(KartografError::Generic(_))
        );
    }

    #[tokio::test]
    async fn cache_is_written_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let source = RestTileSource::new("https://a.b/{z}/{x}/{y}.png")
            .unwrap()
            .with_cache(FileCacheController::new(dir.path(), None).unwrap());

        let url = source.url(TileIndex::new(3, 2, 4)).unwrap();
        assert!(source.read_cache(&url).await.is_none());

        source.write_cache(&url, &Bytes::from_static(b"tile")).await;
        assert_eq!(
            source.read_cache(&url).await,
            Some(Bytes::from_static(b"tile"))
        );
        assert!(dir.path().join("a.b/4/3/2.png").exists());

        let uncached = RestTileSource::new("https://a.b/{z}/{x}/{y}.png").unwrap();
        uncached.write_cache(&url, &Bytes::from_static(b"tile")).await;
        assert!(uncached.read_cache(&url).await.is_none());
    }

    #[test]
    fn url_of_row_outside_of_the_grid() {
        let source = RestTileSource::new("https://a.b/{z}/{x}/{-y}.png").unwrap();
        assert_matches!(
            source.url(TileIndex::new(0, 4, 2)),
            Err(KartografError::Generic(_))
        );
    }

    #[tokio::test]
    async fn offline_mode_uses_cache_only() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCacheController::new(dir.path(), None).unwrap();
        cache
            .insert("https://a.b/2/1/1.png", &Bytes::from_static(b"cached"))
            .unwrap();

        let source = RestTileSource::new("https://a.b/{z}/{x}/{y}.png")
            .unwrap()
            .with_cache(cache)
            .with_offline_mode(true);

        let cached = source
            .fetch_tile(TileIndex::new(1, 1, 2), TileSchema::Xyz)
            .await
            .unwrap();
        assert_eq!(cached, Bytes::from_static(b"cached"));

        assert_matches!(
            source
                .fetch_tile(TileIndex::new(0, 0, 2), TileSchema::Xyz)
                .await,
            Err(KartografError::NotFound)
        );
    }
}
