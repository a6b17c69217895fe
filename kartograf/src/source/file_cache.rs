use std::path::{Path, PathBuf};

use bytes::Bytes;
use crate::error::KartografError;

/// Persistent storage of loaded data.
pub trait PersistentCacheController<Key: ?Sized, Data>: Send + Sync {
    /// Returns the stored entry, if any.
    fn get(&self, key: &Key) -> Option<Data>;
    /// Stores the entry.
    fn insert(&self, key: &Key, data: &Data) -> Result<(), KartografError>;
}

/// Rewrites the relative cache path derived from a url.
pub type FileCachePathModifier = dyn Fn(&str) -> String + Send + Sync;

/// [`FileCachePathModifier`] dropping the query of the url, so that tiles requested with
/// different api keys share one cache entry.
pub fn remove_parameters_modifier(path: &str) -> String {
    path.split('?').next().unwrap_or(path).to_owned()
}

/// Offline cache of downloaded tiles: one file per url under a root folder, without eviction.
///
/// `https://tile.example.com/3/5/2.png` is stored as `{root}/tile.example.com/3/5/2.png`.
pub struct FileCacheController {
    root: PathBuf,
    modifier: Option<Box<FileCachePathModifier>>,
}

impl PersistentCacheController<str, Bytes> for FileCacheController {
    fn get(&self, url: &str) -> Option<Bytes> {
        std::fs::read(self.cache_path(url)).ok().map(Bytes::from)
    }

    fn insert(&self, url: &str, data: &Bytes) -> Result<(), KartografError> {
        let path = self.cache_path(url);
        let Some(folder) = path.parent() else {
            return Err(KartografError::Generic(format!(
                "cache path {path:?} has no parent folder"
            )));
        };

        std::fs::create_dir_all(folder)?;
        std::fs::write(&path, data)?;
        log::debug!("Tile {url} cached as {path:?}");

        Ok(())
    }
}

impl FileCacheController {
    /// Creates a cache in the folder, creating the folder if needed.
    pub fn new(
        root: impl AsRef<Path>,
        modifier: Option<Box<FileCachePathModifier>>,
    ) -> Result<Self, KartografError> {
        let root = root.as_ref();
        std::fs::create_dir_all(root).map_err(|err| {
            KartografError::Generic(format!("cannot create tile cache folder {root:?}: {err}"))
        })?;

        Ok(Self {
            root: root.to_path_buf(),
            modifier,
        })
    }

    fn cache_path(&self, url: &str) -> PathBuf {
        let stripped = url
            .strip_prefix("http://")
            .or_else(|| url.strip_prefix("https://"))
            .unwrap_or(url);

        match &self.modifier {
            Some(modifier) => self.root.join(modifier(stripped)),
            None => self.root.join(stripped),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCacheController::new(dir.path(), None).unwrap();
        let url = "https://tile.example.com/3/5/2.png";
        assert!(cache.get(url).is_none());

        cache.insert(url, &Bytes::from_static(b"tile")).unwrap();
        assert_eq!(cache.get(url).unwrap(), Bytes::from_static(b"tile"));
        assert!(dir.path().join("tile.example.com/3/5/2.png").exists());
    }

    #[test]
    fn parameters_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let cache =
            FileCacheController::new(dir.path(), Some(Box::new(remove_parameters_modifier)))
                .unwrap();
        cache
            .insert("http://a.b/1/2/3.png?key=secret", &Bytes::from_static(b"x"))
            .unwrap();
        assert!(cache.get("http://a.b/1/2/3.png?key=other").is_some());
    }
}
