use crate::blob::BlobCache;
use rubypack_core::{BuildError, BuildResult};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Workspace folder holding one file per fact.
pub const METADATA_FOLDER: &str = "vendor/scalingo";

/// Where older buildpacks kept the same facts. Currently the same folder, so
/// the migration only runs for callers that pass a different location.
const LEGACY_METADATA_FOLDER: &str = "vendor/scalingo";

/// Flat key/value facts remembered between builds.
pub struct MetadataStore {
    cache: BlobCache,
}

impl MetadataStore {
    /// Migrates legacy facts, then restores the folder from the durable cache.
    pub fn open(cache: BlobCache) -> BuildResult<Self> {
        let store = Self { cache };
        store.migrate_from(LEGACY_METADATA_FOLDER)?;
        store.cache.load(METADATA_FOLDER)?;
        Ok(store)
    }

    /// Moves a legacy fact folder into place unless the current one already exists.
    pub fn migrate_from(&self, legacy: impl AsRef<Path>) -> BuildResult<()> {
        let legacy = self.cache.workspace().join(legacy.as_ref());
        let folder = self.folder();
        if legacy == folder {
            return Ok(());
        }

        let fs = self.cache.fs();
        if fs.exists(&legacy) && !fs.exists(&folder) {
            debug!("Migrating metadata from {}", legacy.display());
            if let Some(parent) = folder.parent() {
                fs.create_dir_all(parent)
                    .map_err(|e| BuildError::io("Failed to prepare metadata folder", e))?;
            }
            fs.rename(&legacy, &folder)
                .map_err(|e| BuildError::io("Failed to migrate legacy metadata", e))?;
        }
        Ok(())
    }

    pub fn folder(&self) -> PathBuf {
        self.cache.workspace().join(METADATA_FOLDER)
    }

    /// Trimmed value of `key`, or `None` when the fact is absent or unreadable.
    pub fn read(&self, key: &str) -> Option<String> {
        if !self.exists(key) {
            return None;
        }
        let path = self.key_path(key).ok()?;
        match self.cache.fs().read_to_string(&path) {
            Ok(content) => Some(content.trim().to_string()),
            Err(e) => {
                warn!("Could not read metadata '{}': {:#}", key, e);
                None
            }
        }
    }

    /// A fact exists only as a regular file. A directory of the same name does not count.
    pub fn exists(&self, key: &str) -> bool {
        match self.key_path(key) {
            Ok(path) => self.cache.fs().is_file(&path),
            Err(_) => false,
        }
    }

    /// Writes `value` and immediately persists the folder to the cache.
    pub fn write(&self, key: &str, value: impl Display) -> BuildResult<()> {
        self.write_fact(key, value, true)
    }

    /// Writes `value` without persisting. Call [`save`](Self::save) once the batch is done.
    pub fn write_deferred(&self, key: &str, value: impl Display) -> BuildResult<()> {
        self.write_fact(key, value, false)
    }

    pub fn touch(&self, key: &str) -> BuildResult<()> {
        self.write(key, "true")
    }

    /// Returns the stored value of `key`, computing and persisting it on first use.
    ///
    /// `compute` runs at most once per key for as long as the cache survives,
    /// since later calls (in this build or the next) find the stored file. A
    /// stored value that no longer parses as `T` is recomputed.
    pub fn fetch<T, F>(&self, key: &str, compute: F) -> BuildResult<T>
    where
        T: FromStr + Display,
        F: FnOnce() -> T,
    {
        if let Some(stored) = self.read(key) {
            match stored.parse::<T>() {
                Ok(value) => return Ok(value),
                Err(_) => warn!("Ignoring unparsable metadata '{}': {}", key, stored),
            }
        }

        let value = compute();
        self.write(key, &value)?;
        Ok(value)
    }

    /// Copies the folder into the durable cache, keeping facts written by earlier builds.
    pub fn save(&self) -> BuildResult<bool> {
        self.cache.add(METADATA_FOLDER)
    }

    fn write_fact(&self, key: &str, value: impl Display, persist: bool) -> BuildResult<()> {
        let path = self.key_path(key)?;
        let fs = self.cache.fs();

        fs.create_dir_all(&self.folder())
            .map_err(|e| BuildError::io("Failed to create metadata folder", e))?;
        fs.write(&path, &format!("{}\n", value))
            .map_err(|e| BuildError::io(format!("Failed to write metadata '{}'", key), e))?;

        if persist {
            self.save()?;
        }
        Ok(())
    }

    fn key_path(&self, key: &str) -> BuildResult<PathBuf> {
        if key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\']) {
            return Err(BuildError::InvalidMetadataKey(key.to_string()));
        }
        Ok(self.folder().join(key))
    }
}
