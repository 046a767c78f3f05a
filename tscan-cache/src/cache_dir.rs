//! Cache directory resolution

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use tracing::info;

use crate::{Error, Result};

/// File name of the cache database inside the cache directory
pub const CACHE_FILE_NAME: &str = "tscan_cache.sqlite3";

/// Platform cache directory: `$XDG_CACHE_HOME` or `~/.cache` on Unix,
/// `%LOCALAPPDATA%` on Windows, `~/Library/Caches` on macOS
pub fn default_cache_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Resolve the directory the cache database lives in.
///
/// Returns `Ok(None)` when caching is disabled. An explicit `path` wins over
/// the platform default. A missing directory is created only when
/// `create_if_missing` is set; the returned path is canonical.
pub fn resolve_cache_dir(
    path: Option<&Path>,
    use_cache: bool,
    create_if_missing: bool,
) -> Result<Option<PathBuf>> {
    if !use_cache {
        return Ok(None);
    }

    let cache_path = match path {
        Some(path) => path.to_path_buf(),
        None => default_cache_dir().ok_or_else(|| Error::CacheDir {
            path: PathBuf::new(),
            source: io::Error::new(io::ErrorKind::NotFound, "no home directory found"),
        })?,
    };

    if !cache_path.exists() {
        if !create_if_missing {
            return Err(Error::CacheDirNotFound { path: cache_path });
        }
        fs::create_dir_all(&cache_path).map_err(|source| Error::CacheDir {
            path: cache_path.clone(),
            source,
        })?;
        info!(path = %cache_path.display(), "Created cache directory.");
    }

    let resolved = cache_path.canonicalize().map_err(|source| Error::CacheDir {
        path: cache_path.clone(),
        source,
    })?;
    Ok(Some(resolved))
}

/// Path of the cache database inside `dir`
pub fn default_cache_file(dir: &Path) -> PathBuf {
    dir.join(CACHE_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_cache_resolves_to_none() {
        assert!(resolve_cache_dir(None, false, true).unwrap().is_none());
    }

    #[test]
    fn test_existing_dir_is_canonicalized() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_cache_dir(Some(dir.path()), true, false)
            .unwrap()
            .unwrap();
        assert_eq!(resolved, dir.path().canonicalize().unwrap());
    }

    #[test]
    fn test_missing_dir_without_create_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nested").join("cache");
        let err = resolve_cache_dir(Some(&missing), true, false).unwrap_err();
        assert!(matches!(err, Error::CacheDirNotFound { ref path } if *path == missing));
        assert!(!missing.exists());
    }

    #[test]
    fn test_missing_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nested").join("cache");
        let resolved = resolve_cache_dir(Some(&missing), true, true)
            .unwrap()
            .unwrap();
        assert!(missing.is_dir());
        assert_eq!(resolved, missing.canonicalize().unwrap());
    }

    #[test]
    fn test_default_cache_file() {
        let file = default_cache_file(Path::new("/var/cache"));
        assert_eq!(file, Path::new("/var/cache/tscan_cache.sqlite3"));
    }
}
