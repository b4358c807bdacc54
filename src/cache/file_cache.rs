//! File Cache Module
//!
//! Directory-backed cache of JSON-serialized values with a lifetime measured
//! from each file's last write.

use std::fs::{self, Metadata};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::cache::lifetime_from_secs;
use crate::error::{CacheError, Result};
use crate::singleton::{ConstructorSingleton, KwArgs};

// == File Cache ==
/// One file per entry, named after its key.
///
/// A `lifetime` of zero or less keeps files forever. Expired files are
/// deleted when read.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
    lifetime: f64,
}

impl FileCache {
    // == Constructor ==
    /// Opens (creating if needed) a cache directory.
    ///
    /// # Arguments
    /// * `dir` - Directory holding the entry files
    /// * `lifetime` - Seconds an entry stays valid after being written
    pub fn new(dir: impl Into<PathBuf>, lifetime: f64) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, lifetime })
    }

    // == Get ==
    /// Reads and deserializes an entry. `Ok(None)` when missing or expired.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.path_for(name)?;
        let Some(metadata) = metadata_if_exists(&path)? else {
            return Ok(None);
        };

        if self.is_expired(&metadata)? {
            debug!("File cache entry expired: {}", name);
            remove_if_exists(&path)?;
            return Ok(None);
        }

        let bytes = fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    // == Put ==
    /// Serializes and writes an entry, replacing any previous one.
    ///
    /// Each write goes to its own temporary file in the cache directory and
    /// is renamed into place, so readers never observe a partial entry and
    /// concurrent writers of one name never share a staging file.
    pub fn put<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.path_for(name)?;
        let mut staging = NamedTempFile::new_in(&self.dir)?;

        serde_json::to_writer(&mut staging, value)?;
        staging.persist(&path).map_err(|err| err.error)?;
        Ok(())
    }

    // == Remove ==
    /// Deletes an entry. Missing entries are a no-op.
    pub fn remove(&self, name: &str) -> Result<()> {
        remove_if_exists(&self.path_for(name)?)
    }

    /// Whether a live entry exists.
    pub fn contains(&self, name: &str) -> Result<bool> {
        match metadata_if_exists(&self.path_for(name)?)? {
            Some(metadata) => Ok(!self.is_expired(&metadata)?),
            None => Ok(false),
        }
    }

    /// Deletes every entry file in the directory.
    pub fn clear(&self) -> Result<()> {
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                remove_if_exists(&entry.path())?;
            }
        }
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn lifetime(&self) -> f64 {
        self.lifetime
    }

    fn is_expired(&self, metadata: &Metadata) -> Result<bool> {
        if self.lifetime <= 0.0 {
            return Ok(false);
        }
        let written: DateTime<Utc> = metadata.modified()?.into();
        Ok(Utc::now() - written >= lifetime_from_secs(self.lifetime))
    }

    /// Entry names are single path components. A leading `.` is reserved
    /// for staging files and also rules out `.` and `..`.
    fn path_for(&self, name: &str) -> Result<PathBuf> {
        let invalid = name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']);
        if invalid {
            return Err(CacheError::InvalidKey(name.to_string()));
        }
        Ok(self.dir.join(name))
    }
}

impl ConstructorSingleton for FileCache {
    /// Reads `dir` (required) and `lifetime` (default 0, never expire).
    fn construct(kwargs: &KwArgs) -> Result<Self> {
        Self::new(kwargs.require_str("dir")?, kwargs.f64_or("lifetime", 0.0)?)
    }
}

// == Utility Functions ==
fn metadata_if_exists(path: &Path) -> Result<Option<Metadata>> {
    match fs::metadata(path) {
        Ok(metadata) => Ok(Some(metadata)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::thread::sleep;
    use std::time::Duration;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct CmdData {
        command: String,
        label: String,
    }

    #[test]
    fn test_put_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path(), 0.0).unwrap();
        let data = CmdData {
            command: ".uno:Copy".to_string(),
            label: "Copy".to_string(),
        };

        cache.put("cmds_writer.json", &data).unwrap();
        let loaded: Option<CmdData> = cache.get("cmds_writer.json").unwrap();
        assert_eq!(loaded, Some(data));
        assert!(cache.contains("cmds_writer.json").unwrap());
    }

    #[test]
    fn test_get_missing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path(), 60.0).unwrap();

        let loaded: Option<String> = cache.get("missing").unwrap();
        assert_eq!(loaded, None);
        assert!(!cache.contains("missing").unwrap());
    }

    #[test]
    fn test_new_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let cache = FileCache::new(&nested, 0.0).unwrap();

        assert!(nested.is_dir());
        assert_eq!(cache.dir(), nested.as_path());
    }

    #[test]
    fn test_expired_entry_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path(), 0.2).unwrap();
        cache.put("entry", &vec![1, 2, 3]).unwrap();

        sleep(Duration::from_millis(1100));
        let loaded: Option<Vec<i32>> = cache.get("entry").unwrap();
        assert_eq!(loaded, None);
        assert!(!dir.path().join("entry").exists());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path(), 0.0).unwrap();
        cache.put("entry", "value").unwrap();

        cache.remove("entry").unwrap();
        cache.remove("entry").unwrap();
        assert!(!cache.contains("entry").unwrap());
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path(), 0.0).unwrap();
        cache.put("a", &1).unwrap();
        cache.put("b", &2).unwrap();

        cache.clear().unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_invalid_names_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path(), 0.0).unwrap();

        for name in ["", "../escape", "a/b", "a\\b", ".hidden"] {
            assert!(
                matches!(cache.put(name, &1), Err(CacheError::InvalidKey(_))),
                "{:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_inner_dots_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path(), 0.0).unwrap();

        cache.put("a..b", &1).unwrap();
        assert_eq!(cache.get::<i32>("a..b").unwrap(), Some(1));
        assert!(dir.path().join("a..b").is_file());
    }

    #[test]
    fn test_concurrent_writers_same_name() {
        use std::sync::Arc;
        use std::thread;

        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(FileCache::new(dir.path(), 0.0).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..100 {
                        cache.put("same", &(t * 1000 + i)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let last: Option<i32> = cache.get("same").unwrap();
        assert!(last.is_some());
        // only the entry remains; no staging files are left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_corrupt_entry_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path(), 0.0).unwrap();
        fs::write(dir.path().join("bad"), b"{not json").unwrap();

        let result: Result<Option<CmdData>> = cache.get("bad");
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }
}
