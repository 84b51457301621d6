use super::{absolutize, CopyMode, DirEntry, FileMetadata, FileSystem, FileType};
use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct MockEntry {
    pub content: Option<String>,
    pub file_type: FileType,
    pub modified: Option<SystemTime>,
}

impl MockEntry {
    fn directory() -> Self {
        Self {
            content: None,
            file_type: FileType::Directory,
            modified: None,
        }
    }
}

/// In-memory filesystem. Every file write advances a logical clock by one
/// second, so later writes always carry a newer modification time.
pub struct MockFileSystem {
    files: RwLock<HashMap<PathBuf, MockEntry>>,
    root: PathBuf,
    clock: AtomicU64,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::with_root(PathBuf::from("/mock"))
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            root,
            clock: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> Option<SystemTime> {
        let seconds = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        Some(UNIX_EPOCH + Duration::from_secs(seconds))
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: &str) {
        let path = self.normalize_path(path.as_ref());
        let mut files = self.files.write().unwrap();

        if let Some(parent) = path.parent() {
            Self::ensure_parents(&mut files, parent);
        }

        files.insert(
            path,
            MockEntry {
                content: Some(content.to_string()),
                file_type: FileType::File,
                modified: self.tick(),
            },
        );
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = self.normalize_path(path.as_ref());
        let mut files = self.files.write().unwrap();

        Self::ensure_parents(&mut files, &path);
    }

    /// Adds a symlink entry. Its target is not tracked, so it behaves like a dangling link.
    pub fn add_symlink(&self, path: impl AsRef<Path>) {
        let path = self.normalize_path(path.as_ref());
        let mut files = self.files.write().unwrap();

        if let Some(parent) = path.parent() {
            Self::ensure_parents(&mut files, parent);
        }

        files.insert(
            path,
            MockEntry {
                content: None,
                file_type: FileType::Symlink,
                modified: self.tick(),
            },
        );
    }

    /// Relative paths of every file and symlink below `dir`, sorted.
    pub fn list_files(&self, dir: impl AsRef<Path>) -> Vec<PathBuf> {
        let dir = self.normalize_path(dir.as_ref());
        let files = self.files.read().unwrap();

        let mut result: Vec<PathBuf> = files
            .iter()
            .filter(|(path, entry)| {
                entry.file_type != FileType::Directory && path.starts_with(&dir)
            })
            .filter_map(|(path, _)| path.strip_prefix(&dir).ok().map(Path::to_path_buf))
            .collect();
        result.sort();
        result
    }

    fn normalize_path(&self, path: &Path) -> PathBuf {
        absolutize(&self.root, path)
    }

    fn ensure_parents(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            if !files.contains_key(&current) {
                files.insert(current.clone(), MockEntry::directory());
            }
        }
    }

    fn place(
        files: &mut HashMap<PathBuf, MockEntry>,
        target: PathBuf,
        entry: MockEntry,
        mode: CopyMode,
    ) {
        if entry.file_type == FileType::Directory {
            Self::ensure_parents(files, &target);
            return;
        }
        if !mode.overwrites() && files.contains_key(&target) {
            return;
        }
        if let Some(parent) = target.parent() {
            Self::ensure_parents(files, parent);
        }
        files.insert(target, entry);
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        let path = self.normalize_path(path);
        self.files.read().unwrap().contains_key(&path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        let path = self.normalize_path(path);
        self.files
            .read()
            .unwrap()
            .get(&path)
            .map(|e| e.file_type == FileType::Directory)
            .unwrap_or(false)
    }

    fn is_file(&self, path: &Path) -> bool {
        let path = self.normalize_path(path);
        self.files
            .read()
            .unwrap()
            .get(&path)
            .map(|e| e.file_type == FileType::File)
            .unwrap_or(false)
    }

    fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        let path = self.normalize_path(path);
        let files = self.files.read().unwrap();
        let entry = files
            .get(&path)
            .ok_or_else(|| anyhow!("Path not found: {:?}", path))?;

        Ok(FileMetadata {
            size: entry.content.as_ref().map(|c| c.len() as u64).unwrap_or(0),
            file_type: entry.file_type,
            modified: entry.modified,
        })
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let path = self.normalize_path(path);
        let files = self.files.read().unwrap();
        let entry = files
            .get(&path)
            .ok_or_else(|| anyhow!("File not found: {:?}", path))?;

        entry
            .content
            .clone()
            .ok_or_else(|| anyhow!("Not a file: {:?}", path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let path = self.normalize_path(path);
        let files = self.files.read().unwrap();

        if !files.contains_key(&path) {
            return Err(anyhow!("Directory not found: {:?}", path));
        }

        let mut entries = Vec::new();
        for (file_path, entry) in files.iter() {
            if let Some(parent) = file_path.parent() {
                if parent == path && file_path != &path {
                    let name = file_path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("")
                        .to_string();

                    entries.push(DirEntry {
                        path: file_path.clone(),
                        name,
                        file_type: entry.file_type,
                    });
                }
            }
        }

        Ok(entries)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        let normalized = self.normalize_path(path);
        if self.files.read().unwrap().contains_key(&normalized) {
            Ok(normalized)
        } else {
            Err(anyhow!("Path not found: {:?}", path))
        }
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let path = self.normalize_path(path);
        let mut files = self.files.write().unwrap();

        if files
            .get(&path)
            .is_some_and(|e| e.file_type != FileType::Directory)
        {
            bail!("File exists: {:?}", path);
        }
        Self::ensure_parents(&mut files, &path);
        Ok(())
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        let path = self.normalize_path(path);
        let mut files = self.files.write().unwrap();

        let parent_is_dir = path
            .parent()
            .and_then(|p| files.get(p))
            .is_some_and(|e| e.file_type == FileType::Directory);
        if !parent_is_dir {
            bail!("No such file or directory: {:?}", path);
        }
        if files
            .get(&path)
            .is_some_and(|e| e.file_type == FileType::Directory)
        {
            bail!("Is a directory: {:?}", path);
        }

        files.insert(
            path,
            MockEntry {
                content: Some(contents.to_string()),
                file_type: FileType::File,
                modified: self.tick(),
            },
        );
        Ok(())
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        let path = self.normalize_path(path);
        self.files
            .write()
            .unwrap()
            .retain(|p, _| !p.starts_with(&path));
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from = self.normalize_path(from);
        let to = self.normalize_path(to);
        let mut files = self.files.write().unwrap();

        if !files.contains_key(&from) {
            bail!("No such file or directory: {:?}", from);
        }

        let moved: Vec<(PathBuf, MockEntry)> = files
            .iter()
            .filter(|(p, _)| p.starts_with(&from))
            .map(|(p, e)| (p.clone(), e.clone()))
            .collect();
        files.retain(|p, _| !p.starts_with(&from));

        if let Some(parent) = to.parent() {
            Self::ensure_parents(&mut files, parent);
        }
        for (path, entry) in moved {
            let rel = path.strip_prefix(&from)?;
            let target = if rel.as_os_str().is_empty() {
                to.clone()
            } else {
                to.join(rel)
            };
            files.insert(target, entry);
        }
        Ok(())
    }

    fn copy_contents(&self, from: &Path, to: &Path, mode: CopyMode) -> Result<()> {
        let from = self.normalize_path(from);
        let to = self.normalize_path(to);
        let mut files = self.files.write().unwrap();

        let source = files.get(&from).cloned().ok_or_else(|| {
            anyhow!(
                "Command failed `cp {} {:?} {:?}`: No such file or directory",
                mode.cp_flags().join(" "),
                from,
                to
            )
        })?;

        if source.file_type != FileType::Directory {
            Self::place(&mut files, to, source, mode);
            return Ok(());
        }

        let mut children: Vec<(PathBuf, MockEntry)> = files
            .iter()
            .filter(|(p, _)| p.starts_with(&from) && **p != from)
            .map(|(p, e)| (p.clone(), e.clone()))
            .collect();
        children.sort_by(|a, b| a.0.cmp(&b.0));

        Self::ensure_parents(&mut files, &to);
        for (path, entry) in children {
            let rel = path.strip_prefix(&from)?;
            Self::place(&mut files, to.join(rel), entry, mode);
        }
        Ok(())
    }
}
