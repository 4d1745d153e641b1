use std::num::NonZeroUsize;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use lru::LruCache;

use crate::config::ArtifactConfig;
use crate::error::{AppError, AppResult};

pub const ARTIFACT_SUFFIX: &str = "multi.sir.in";

/// Loads per-theme book artifacts from disk and keeps recent blobs in memory.
#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    cache: LruCache<PathBuf, Arc<Vec<u8>>>,
    hits: u64,
    misses: u64,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            root: root.into(),
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    pub fn from_config(config: &ArtifactConfig) -> Self {
        Self::new(config.root.clone(), config.cache_entries)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<rel_path>.<theme>.multi.sir.in`
    pub fn artifact_path(&self, rel_path: &str, theme: &str) -> AppResult<PathBuf> {
        if rel_path.trim().is_empty() {
            return Err(AppError::invalid_argument("artifact path must not be empty"));
        }
        if !Path::new(rel_path)
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
        {
            return Err(AppError::invalid_argument(format!(
                "artifact path {rel_path:?} must stay below the artifact root"
            )));
        }
        if theme.is_empty() || !theme.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-') {
            return Err(AppError::invalid_argument(format!(
                "invalid theme name {theme:?}"
            )));
        }
        Ok(self
            .root
            .join(format!("{rel_path}.{theme}.{ARTIFACT_SUFFIX}")))
    }

    pub fn load(&mut self, rel_path: &str, theme: &str) -> AppResult<Arc<Vec<u8>>> {
        let path = self.artifact_path(rel_path, theme)?;
        if let Some(bytes) = self.cache.get(&path) {
            self.hits += 1;
            return Ok(Arc::clone(bytes));
        }

        self.misses += 1;
        let bytes = load_shared_bytes(&path)?;
        log::debug!(
            "loaded artifact {} ({} bytes)",
            path.display(),
            bytes.len()
        );
        self.cache.put(path, Arc::clone(&bytes));
        Ok(bytes)
    }

    pub fn invalidate(&mut self, rel_path: &str, theme: &str) -> AppResult<bool> {
        let path = self.artifact_path(rel_path, theme)?;
        Ok(self.cache.pop(&path).is_some())
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

pub fn load_shared_bytes(path: impl AsRef<Path>) -> AppResult<Arc<Vec<u8>>> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(AppError::invalid_argument("artifact path must not be empty"));
    }
    if !path.exists() {
        return Err(AppError::io_with_context(
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing file"),
            format!("artifact file not found: {}", path.display()),
        ));
    }
    if !path.is_file() {
        return Err(AppError::invalid_argument(
            "artifact path must be a regular file",
        ));
    }

    let bytes = std::fs::read(path).map_err(|source| {
        AppError::io_with_context(source, format!("failed to read {}", path.display()))
    })?;
    Ok(Arc::new(bytes))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::process;
    use std::sync::Arc;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::{ArtifactStore, load_shared_bytes};
    use crate::error::AppError;

    fn unique_temp_path(suffix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!("pgc_store_{suffix}_{}_{}", process::id(), nanos));
        path
    }

    #[test]
    fn artifact_path_follows_theme_naming() {
        let store = ArtifactStore::new("/book", 2);
        let path = store
            .artifact_path("guide/intro", "dark")
            .expect("path should resolve");
        assert_eq!(path, PathBuf::from("/book/guide/intro.dark.multi.sir.in"));
        assert!(store.artifact_path("intro", "../x").is_err());
        assert!(store.artifact_path(" ", "light").is_err());
    }

    #[test]
    fn artifact_path_rejects_escapes_from_the_root() {
        let store = ArtifactStore::new("/book", 2);
        for rel_path in ["../../x", "guide/../../x", "/etc/passwd", "./intro"] {
            assert!(
                matches!(
                    store.artifact_path(rel_path, "light"),
                    Err(AppError::InvalidArgument(_))
                ),
                "{rel_path} should be rejected"
            );
        }
    }

    #[test]
    fn load_caches_blobs_until_evicted() {
        let root = unique_temp_path("root");
        fs::create_dir_all(&root).expect("root dir should be created");
        fs::write(root.join("a.light.multi.sir.in"), b"{}").expect("artifact a");
        fs::write(root.join("b.light.multi.sir.in"), b"[]").expect("artifact b");

        let mut store = ArtifactStore::new(&root, 1);
        let first = store.load("a", "light").expect("first load");
        let again = store.load("a", "light").expect("cached load");
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(store.hit_rate(), 0.5);

        store.load("b", "light").expect("second artifact");
        assert_eq!(store.cached_len(), 1);
        assert!(!store.invalidate("a", "light").expect("valid key"));

        fs::remove_dir_all(&root).expect("root dir should be removed");
    }

    #[test]
    fn load_shared_bytes_reports_missing_and_non_file_paths() {
        let missing = unique_temp_path("missing.sir.in");
        assert!(matches!(
            load_shared_bytes(&missing),
            Err(AppError::Io { .. })
        ));

        let dir = unique_temp_path("dir");
        fs::create_dir_all(&dir).expect("dir should be created");
        assert!(matches!(
            load_shared_bytes(&dir),
            Err(AppError::InvalidArgument(_))
        ));
        fs::remove_dir_all(&dir).expect("dir should be removed");
    }
}
