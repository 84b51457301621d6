//! FileSystem trait definition

use anyhow::Result;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

/// Metadata about a file
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub file_type: FileType,
    /// Last modification time, when the platform reports one
    pub modified: Option<SystemTime>,
}

/// Type of file system entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
    Symlink,
}

impl FileMetadata {
    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }

    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }
}

/// A directory entry returned by read_dir
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub path: PathBuf,
    pub name: String,
    pub file_type: FileType,
}

impl DirEntry {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.name
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }
}

/// How a recursive copy treats files that already exist at the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    /// `cp -a`: existing files are replaced.
    Replace,
    /// `cp -a -n`: existing files are kept.
    NoClobber,
    /// `cp -a --update=none`: existing files are kept.
    UpdateNone,
}

impl CopyMode {
    pub fn cp_flags(&self) -> &'static [&'static str] {
        match self {
            CopyMode::Replace => &["-a"],
            CopyMode::NoClobber => &["-a", "-n"],
            CopyMode::UpdateNone => &["-a", "--update=none"],
        }
    }

    pub fn overwrites(&self) -> bool {
        matches!(self, CopyMode::Replace)
    }
}

/// Abstraction over file system operations for testability
pub trait FileSystem: Send + Sync {
    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Check if path is a file
    fn is_file(&self, path: &Path) -> bool;

    /// Get file/directory metadata
    fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Read file contents as string
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// List directory contents
    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;

    /// Canonicalize a path
    fn canonicalize(&self, path: &Path) -> Result<PathBuf>;

    /// Create a directory and all missing parents
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Write a file, replacing any previous contents
    fn write(&self, path: &Path, contents: &str) -> Result<()>;

    /// Remove a file or a directory tree. Missing paths are not an error.
    fn remove_all(&self, path: &Path) -> Result<()>;

    /// Move a file or directory
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Recursively copy the contents of `from` into `to`.
    ///
    /// When `from` is a directory its children land directly in `to`
    /// (`cp <flags> from/. to`), which is created if missing.
    fn copy_contents(&self, from: &Path, to: &Path, mode: CopyMode) -> Result<()>;
}

/// Resolve `path` against `base` and fold `.` and `..` without touching the disk.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_metadata_is_file() {
        let meta = FileMetadata {
            size: 100,
            file_type: FileType::File,
            modified: None,
        };
        assert!(meta.is_file());
        assert!(!meta.is_dir());
    }

    #[test]
    fn test_file_metadata_is_dir() {
        let meta = FileMetadata {
            size: 0,
            file_type: FileType::Directory,
            modified: None,
        };
        assert!(meta.is_dir());
        assert!(!meta.is_file());
    }

    #[test]
    fn test_cp_flags() {
        assert_eq!(CopyMode::Replace.cp_flags(), &["-a"]);
        assert_eq!(CopyMode::NoClobber.cp_flags(), &["-a", "-n"]);
        assert_eq!(CopyMode::UpdateNone.cp_flags(), &["-a", "--update=none"]);
        assert!(CopyMode::Replace.overwrites());
        assert!(!CopyMode::NoClobber.overwrites());
        assert!(!CopyMode::UpdateNone.overwrites());
    }

    #[test]
    fn test_absolutize_relative() {
        assert_eq!(
            absolutize(Path::new("/app"), Path::new("vendor/scalingo")),
            PathBuf::from("/app/vendor/scalingo")
        );
    }

    #[test]
    fn test_absolutize_folds_dots() {
        assert_eq!(
            absolutize(Path::new("/app"), Path::new("./tmp/../public/./assets")),
            PathBuf::from("/app/public/assets")
        );
        assert_eq!(
            absolutize(Path::new("/app"), Path::new("/cache/public/assets/..")),
            PathBuf::from("/cache/public")
        );
    }
}
