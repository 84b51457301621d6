use rubypack_core::fs::{absolutize, CopyMode, FileSystem};
use rubypack_core::{BuildError, BuildResult, Stack};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Copies files between the build workspace and a durable cache root.
///
/// Every operation is a no-op when no cache root is configured: copies
/// report `false`, `exists` reports `false`, and nothing fails.
#[derive(Clone)]
pub struct BlobCache {
    fs: Arc<dyn FileSystem>,
    workspace: PathBuf,
    base: Option<PathBuf>,
    no_overwrite_mode: CopyMode,
}

impl BlobCache {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        workspace: impl Into<PathBuf>,
        base: Option<PathBuf>,
        stack: &Stack,
    ) -> Self {
        Self {
            fs,
            workspace: workspace.into(),
            base,
            no_overwrite_mode: stack.no_overwrite_mode(),
        }
    }

    pub fn disabled(fs: Arc<dyn FileSystem>, workspace: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            workspace: workspace.into(),
            base: None,
            no_overwrite_mode: CopyMode::UpdateNone,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.base.is_some()
    }

    pub fn base(&self) -> Option<&Path> {
        self.base.as_deref()
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Removes `path` from the cache root. Missing entries are ignored.
    pub fn clear(&self, path: impl AsRef<Path>) -> BuildResult<()> {
        let Some(base) = &self.base else {
            return Ok(());
        };

        let target = cache_path(base, path.as_ref());
        if self.fs.exists(&target) {
            debug!("Clearing cache entry {}", target.display());
            self.fs
                .remove_all(&target)
                .map_err(|e| BuildError::io(format!("Failed to clear cache entry {:?}", target), e))?;
        }
        Ok(())
    }

    /// Replaces the cached copy of `path` with the workspace contents.
    pub fn store(&self, path: impl AsRef<Path>) -> BuildResult<bool> {
        self.store_as(path.as_ref(), path.as_ref())
    }

    /// Clears `to` in the cache, then copies workspace `from` into it, so no
    /// stale files from a previous build survive.
    pub fn store_as(&self, from: impl AsRef<Path>, to: impl AsRef<Path>) -> BuildResult<bool> {
        let Some(base) = &self.base else {
            return Ok(false);
        };

        let source = absolutize(&self.workspace, from.as_ref());
        let target = cache_path(base, to.as_ref());
        if self.same_location(&source, &target) {
            return Ok(true);
        }

        self.clear(to.as_ref())?;
        self.copy(&source, &target, CopyMode::Replace)
    }

    /// Copies workspace `path` into the cache without clearing it first.
    ///
    /// Files removed from the workspace stay in the cache; prefer [`store`](Self::store)
    /// for anything that can accumulate.
    pub fn add(&self, path: impl AsRef<Path>) -> BuildResult<bool> {
        self.add_as(path.as_ref(), path.as_ref())
    }

    pub fn add_as(&self, from: impl AsRef<Path>, to: impl AsRef<Path>) -> BuildResult<bool> {
        let Some(base) = &self.base else {
            return Ok(false);
        };

        let source = absolutize(&self.workspace, from.as_ref());
        let target = cache_path(base, to.as_ref());
        self.copy(&source, &target, CopyMode::Replace)
    }

    /// Restores cached `path` into the workspace, replacing existing files.
    pub fn load(&self, path: impl AsRef<Path>) -> BuildResult<bool> {
        self.load_into(path.as_ref(), path.as_ref())
    }

    pub fn load_into(&self, path: impl AsRef<Path>, dest: impl AsRef<Path>) -> BuildResult<bool> {
        let Some(base) = &self.base else {
            return Ok(false);
        };

        let source = cache_path(base, path.as_ref());
        let target = absolutize(&self.workspace, dest.as_ref());
        self.copy(&source, &target, CopyMode::Replace)
    }

    /// Restores cached `path` into the workspace, leaving every file that
    /// already exists there untouched.
    pub fn load_without_overwrite(&self, path: impl AsRef<Path>) -> BuildResult<bool> {
        self.load_without_overwrite_into(path.as_ref(), path.as_ref())
    }

    pub fn load_without_overwrite_into(
        &self,
        path: impl AsRef<Path>,
        dest: impl AsRef<Path>,
    ) -> BuildResult<bool> {
        let Some(base) = &self.base else {
            return Ok(false);
        };

        let source = cache_path(base, path.as_ref());
        let target = absolutize(&self.workspace, dest.as_ref());
        self.copy(&source, &target, self.no_overwrite_mode)
    }

    /// Copies between two locations inside the cache root.
    pub fn cache_copy(&self, from: impl AsRef<Path>, to: impl AsRef<Path>) -> BuildResult<bool> {
        let Some(base) = &self.base else {
            return Ok(false);
        };

        let source = cache_path(base, from.as_ref());
        let target = cache_path(base, to.as_ref());
        self.copy(&source, &target, CopyMode::Replace)
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        match &self.base {
            Some(base) => self.fs.exists(&cache_path(base, path.as_ref())),
            None => false,
        }
    }

    fn copy(&self, from: &Path, to: &Path, mode: CopyMode) -> BuildResult<bool> {
        if !self.fs.exists(from) {
            debug!("Nothing to copy at {}", from.display());
            return Ok(false);
        }
        if self.same_location(from, to) {
            return Ok(true);
        }

        let copy_error = |e: anyhow::Error| BuildError::CacheCopy {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            reason: format!("{:#}", e),
        };

        if let Some(parent) = to.parent() {
            self.fs.create_dir_all(parent).map_err(copy_error)?;
        }
        debug!(
            "Copying {} to {} ({:?})",
            from.display(),
            to.display(),
            mode
        );
        self.fs.copy_contents(from, to, mode).map_err(copy_error)?;
        Ok(true)
    }
}

impl BlobCache {
    /// Whether both paths name the same place once relative roots and
    /// symlinks are resolved.
    fn same_location(&self, a: &Path, b: &Path) -> bool {
        if a == b {
            return true;
        }
        match (self.fs.canonicalize(a), self.fs.canonicalize(b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

/// Keys are always relative to the cache root, even when given with a leading
/// `/` or with `..` segments. The root itself is kept as given.
fn cache_path(base: &Path, key: &Path) -> PathBuf {
    let folded = absolutize(Path::new("/"), key);
    let relative: PathBuf = folded
        .components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
        .collect();
    base.join(relative)
}
