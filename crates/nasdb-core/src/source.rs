//! Local-disk `FileSource`, confined to a root directory.
//!
//! Paths handed out and accepted are root-relative and `/`-prefixed
//! (`/docs/a.txt`), the same shape a NAS share path has, so folder prefixes
//! line up with what the index stores.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::error::{Error, Result};
use crate::traits::FileSource;
use crate::types::{FileItem, FolderContents};

pub struct LocalFolderSource {
    root: PathBuf,
}

impl LocalFolderSource {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let root = root.canonicalize().map_err(|e| Error::NotFound(format!("{}: {e}", root.display())))?;
        if !root.is_dir() { return Err(Error::NotFound(format!("{} is not a directory", root.display()))); }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path { &self.root }

    /// Maps a `/`-prefixed virtual path to a directory under the root.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let mut full = self.root.clone();
        for component in Path::new(path.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => full.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(Error::AccessDenied(format!("{path} is outside the root directory")));
                }
            }
        }
        // Symlinks may still point outside the root.
        if full.exists() {
            let canonical = full.canonicalize().map_err(|e| Error::NotFound(format!("{path}: {e}")))?;
            if !canonical.starts_with(&self.root) {
                return Err(Error::AccessDenied(format!("{path} is outside the root directory")));
            }
            return Ok(canonical);
        }
        Ok(full)
    }

    fn virtual_path(&self, p: &Path) -> String {
        let rel = p.strip_prefix(&self.root).unwrap_or(p);
        let joined = rel.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/");
        format!("/{joined}")
    }

    fn dir(&self, path: &str) -> Result<PathBuf> {
        let dir = self.resolve(path)?;
        if !dir.is_dir() { return Err(Error::NotFound(format!("Directory not found or path is not a directory: {path}"))); }
        Ok(dir)
    }
}

impl FileSource for LocalFolderSource {
    fn list(&self, path: &str) -> Result<Vec<FileItem>> {
        let dir = self.dir(path)?;
        let entries = fs::read_dir(&dir).map_err(|e| Error::Operation(format!("listing {path}: {e}")))?;
        let mut items = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::Operation(format!("listing {path}: {e}")))?;
            let meta = entry.metadata().map_err(|e| Error::Operation(format!("reading metadata: {e}")))?;
            let last_modified = meta.modified().ok().and_then(|t| t.duration_since(UNIX_EPOCH).ok()).map_or(0.0, |d| d.as_secs_f64());
            items.push(FileItem {
                name: entry.file_name().to_string_lossy().to_string(),
                is_directory: meta.is_dir(),
                path: self.virtual_path(&entry.path()),
                size: if meta.is_dir() { None } else { Some(meta.len()) },
                last_modified,
            });
        }
        items.sort_by(|a, b| b.is_directory.cmp(&a.is_directory).then_with(|| a.name.cmp(&b.name)));
        Ok(items)
    }

    fn read_folder(&self, path: &str) -> Result<FolderContents> {
        let dir = self.dir(path)?;
        let mut contents = FolderContents::new();
        for entry in walkdir::WalkDir::new(&dir).into_iter().filter_map(std::result::Result::ok).filter(|e| e.file_type().is_file()) {
            let bytes = match fs::read(entry.path()) {
                Ok(b) => b,
                Err(e) => { tracing::warn!(path = %entry.path().display(), error = %e, "unreadable file skipped"); continue; }
            };
            // NUL bytes mark binary content even when it happens to be valid UTF-8.
            if bytes.contains(&0) { tracing::debug!(path = %entry.path().display(), "binary file skipped"); continue; }
            match String::from_utf8(bytes) {
                Ok(text) => { contents.insert(self.virtual_path(entry.path()), text); }
                Err(_) => tracing::debug!(path = %entry.path().display(), "non-UTF-8 file skipped"),
            }
        }
        tracing::info!(folder = path, files = contents.len(), "read folder");
        Ok(contents)
    }
}
