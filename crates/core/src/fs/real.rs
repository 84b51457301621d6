use super::{CopyMode, DirEntry, FileMetadata, FileSystem, FileType};
use anyhow::{bail, Context, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

pub struct RealFileSystem;

impl RealFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RealFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn classify(path: &Path) -> FileType {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => FileType::Symlink,
        Ok(meta) if meta.is_dir() => FileType::Directory,
        _ => FileType::File,
    }
}

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        let meta = fs::metadata(path).context(format!("Failed to get metadata for {:?}", path))?;

        let file_type = if meta.is_file() {
            FileType::File
        } else if meta.is_dir() {
            FileType::Directory
        } else {
            FileType::Symlink
        };

        Ok(FileMetadata {
            size: meta.len(),
            file_type,
            modified: meta.modified().ok(),
        })
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).context(format!("Failed to read file {:?}", path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let entries = fs::read_dir(path).context(format!("Failed to read directory {:?}", path))?;

        let mut result = Vec::new();
        for entry in entries {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            let file_type = classify(&path);

            result.push(DirEntry {
                path,
                name,
                file_type,
            });
        }

        Ok(result)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        path.canonicalize()
            .context(format!("Failed to canonicalize path {:?}", path))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).context(format!("Failed to create directory {:?}", path))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        fs::write(path, contents).context(format!("Failed to write file {:?}", path))
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(path)
                .context(format!("Failed to remove directory {:?}", path)),
            Ok(_) => fs::remove_file(path).context(format!("Failed to remove file {:?}", path)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context(format!("Failed to inspect {:?}", path)),
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).context(format!("Failed to move {:?} to {:?}", from, to))
    }

    fn copy_contents(&self, from: &Path, to: &Path, mode: CopyMode) -> Result<()> {
        let source = if from.is_dir() {
            let mut s = OsString::from(from.as_os_str());
            s.push("/.");
            PathBuf::from(s)
        } else {
            from.to_path_buf()
        };

        let command = format!(
            "cp {} {} {}",
            mode.cp_flags().join(" "),
            source.display(),
            to.display()
        );
        debug!("Running `{}`", command);

        let output = Command::new("cp")
            .args(mode.cp_flags())
            .arg(&source)
            .arg(to)
            .output()
            .context(format!("Failed to spawn `{}`", command))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "Command failed `{}` ({}): {}",
                command,
                output.status,
                stderr.trim()
            );
        }

        Ok(())
    }
}
