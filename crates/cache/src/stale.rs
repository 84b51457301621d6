use rubypack_core::fs::{FileSystem, FileType};
use rubypack_core::{BuildError, BuildResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info};

/// Outcome of a [`StaleFileCleaner::clean_over`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanSummary {
    pub removed_files: usize,
    pub removed_bytes: u64,
    pub remaining_bytes: u64,
}

/// Keeps a directory under a size limit by deleting its least recently
/// modified files first.
pub struct StaleFileCleaner {
    fs: Arc<dyn FileSystem>,
    dir: PathBuf,
}

struct TrackedFile {
    path: PathBuf,
    size: u64,
    modified: Option<SystemTime>,
}

impl StaleFileCleaner {
    pub fn new(fs: Arc<dyn FileSystem>, dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            dir: dir.into(),
        }
    }

    /// Total size in bytes of every regular file below the directory.
    pub fn total_size(&self) -> BuildResult<u64> {
        Ok(self.collect_files()?.iter().map(|f| f.size).sum())
    }

    /// Deletes the oldest files until the directory holds at most `limit`
    /// bytes. A missing directory is left alone.
    pub fn clean_over(&self, limit: u64) -> BuildResult<CleanSummary> {
        let mut files = self.collect_files()?;
        let mut total: u64 = files.iter().map(|f| f.size).sum();
        let mut summary = CleanSummary {
            remaining_bytes: total,
            ..CleanSummary::default()
        };
        if total <= limit {
            return Ok(summary);
        }

        // Files without a timestamp are treated as the oldest.
        files.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));

        for file in files {
            if total <= limit {
                break;
            }
            debug!("Removing stale file {}", file.path.display());
            self.fs.remove_all(&file.path).map_err(|e| {
                BuildError::io(format!("Failed to remove stale file {:?}", file.path), e)
            })?;
            total -= file.size;
            summary.removed_files += 1;
            summary.removed_bytes += file.size;
        }
        summary.remaining_bytes = total;

        info!(
            dir = %self.dir.display(),
            removed_files = summary.removed_files,
            removed_bytes = summary.removed_bytes,
            limit,
            "Cleaned stale files"
        );
        Ok(summary)
    }

    fn collect_files(&self) -> BuildResult<Vec<TrackedFile>> {
        let mut files = Vec::new();
        if self.fs.is_dir(&self.dir) {
            self.walk(&self.dir, &mut files)?;
        }
        Ok(files)
    }

    fn walk(&self, dir: &Path, files: &mut Vec<TrackedFile>) -> BuildResult<()> {
        let entries = self
            .fs
            .read_dir(dir)
            .map_err(|e| BuildError::io(format!("Failed to list {:?}", dir), e))?;

        for entry in entries {
            match entry.file_type {
                FileType::Directory => self.walk(&entry.path, files)?,
                FileType::File => {
                    let meta = self.fs.metadata(&entry.path).map_err(|e| {
                        BuildError::io(format!("Failed to stat {:?}", entry.path), e)
                    })?;
                    files.push(TrackedFile {
                        path: entry.path,
                        size: meta.size,
                        modified: meta.modified,
                    });
                }
                FileType::Symlink => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rubypack_core::fs::RealFileSystem;
    use rubypack_core::MockFileSystem;
    use tempfile::TempDir;

    fn cleaner(fs: &Arc<MockFileSystem>) -> StaleFileCleaner {
        StaleFileCleaner::new(fs.clone(), "/app/tmp/cache/assets")
    }

    #[test]
    fn test_under_limit_keeps_everything() {
        let fs = Arc::new(MockFileSystem::with_root(PathBuf::from("/app")));
        fs.add_file("tmp/cache/assets/a", "aaaa");
        fs.add_file("tmp/cache/assets/b", "bbbb");

        let summary = cleaner(&fs).clean_over(8).unwrap();

        assert_eq!(summary.removed_files, 0);
        assert_eq!(summary.remaining_bytes, 8);
        assert_eq!(fs.list_files("tmp/cache/assets").len(), 2);
    }

    #[test]
    fn test_removes_oldest_files_first() {
        let fs = Arc::new(MockFileSystem::with_root(PathBuf::from("/app")));
        fs.add_file("tmp/cache/assets/sprockets/v4/old", "0123456789");
        fs.add_file("tmp/cache/assets/older", "0123456789");
        fs.add_file("tmp/cache/assets/sprockets/v4/new", "0123456789");

        let summary = cleaner(&fs).clean_over(15).unwrap();

        assert_eq!(
            summary,
            CleanSummary {
                removed_files: 2,
                removed_bytes: 20,
                remaining_bytes: 10,
            }
        );
        assert_eq!(
            fs.list_files("tmp/cache/assets"),
            vec![PathBuf::from("sprockets/v4/new")]
        );
    }

    #[test]
    fn test_missing_directory_is_ignored() {
        let fs = Arc::new(MockFileSystem::with_root(PathBuf::from("/app")));
        let summary = cleaner(&fs).clean_over(0).unwrap();
        assert_eq!(summary, CleanSummary::default());
    }

    #[test]
    fn test_total_size_skips_symlinks() {
        let fs = Arc::new(MockFileSystem::with_root(PathBuf::from("/app")));
        fs.add_file("tmp/cache/assets/a", "abc");
        fs.add_symlink("tmp/cache/assets/link");

        assert_eq!(cleaner(&fs).total_size().unwrap(), 3);
    }

    #[test]
    fn test_clean_over_on_real_filesystem() {
        let dir = TempDir::new().unwrap();
        let assets = dir.path().join("assets");
        std::fs::create_dir_all(assets.join("nested")).unwrap();
        std::fs::write(assets.join("a"), vec![b'a'; 600]).unwrap();
        std::fs::write(assets.join("nested/b"), vec![b'b'; 600]).unwrap();

        let cleaner = StaleFileCleaner::new(Arc::new(RealFileSystem::new()), &assets);
        assert_eq!(cleaner.total_size().unwrap(), 1200);

        let summary = cleaner.clean_over(1000).unwrap();
        assert_eq!(summary.removed_files, 1);
        assert_eq!(summary.remaining_bytes, 600);
        assert_eq!(cleaner.total_size().unwrap(), 600);
    }
}
