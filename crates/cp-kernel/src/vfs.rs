//! In-memory filesystem shared between callers and the kernel
//!
//! Files are staged here before the kernel reads them, and the kernel's
//! writers place their output here. Paths are plain strings.

use std::collections::HashMap;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::kernel::{KernelError, KernelResult};

/// Thread-safe in-memory filesystem
#[derive(Debug, Default)]
pub struct VirtualFs {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl VirtualFs {
    /// Create an empty filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a file, replacing any previous content
    pub fn write_file(&self, path: &str, data: Vec<u8>) {
        self.files.lock().insert(path.to_string(), data);
    }

    /// Read a copy of a file's content
    pub fn read_file(&self, path: &str) -> KernelResult<Vec<u8>> {
        self.files
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| KernelError::FileNotFound(path.to_string()))
    }

    /// Remove a file. Returns whether it existed.
    pub fn unlink(&self, path: &str) -> bool {
        self.files.lock().remove(path).is_some()
    }

    /// Check if a file exists
    pub fn exists(&self, path: &str) -> bool {
        self.files.lock().contains_key(path)
    }

    /// Number of files currently stored
    pub fn len(&self) -> usize {
        self.files.lock().len()
    }

    /// Check if the filesystem holds no files
    pub fn is_empty(&self) -> bool {
        self.files.lock().is_empty()
    }
}

/// Build a path unique to one operation, e.g. `/stage/<uuid>.step`
pub fn unique_path(dir: &str, extension: &str) -> String {
    format!("/{}/{}.{}", dir.trim_matches('/'), Uuid::new_v4(), extension)
}

/// A file in a [`VirtualFs`] that is unlinked when the guard is dropped
#[derive(Debug)]
pub struct StagedFile<'fs> {
    fs: &'fs VirtualFs,
    path: String,
}

impl<'fs> StagedFile<'fs> {
    /// Write `data` at `path` and take ownership of the file
    pub fn create(fs: &'fs VirtualFs, path: String, data: Vec<u8>) -> Self {
        fs.write_file(&path, data);
        Self { fs, path }
    }

    /// Take ownership of a path that someone else will write
    pub fn reserve(fs: &'fs VirtualFs, path: String) -> Self {
        Self { fs, path }
    }

    /// Path of the staged file
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Read the file's current content
    pub fn read(&self) -> KernelResult<Vec<u8>> {
        self.fs.read_file(&self.path)
    }
}

impl Drop for StagedFile<'_> {
    fn drop(&mut self) {
        if self.fs.unlink(&self.path) {
            tracing::trace!(path = %self.path, "Unlinked staged file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_unlink() {
        let fs = VirtualFs::new();
        fs.write_file("/a.step", b"abc".to_vec());
        assert!(fs.exists("/a.step"));
        assert_eq!(fs.read_file("/a.step").unwrap(), b"abc");
        assert!(fs.unlink("/a.step"));
        assert!(!fs.unlink("/a.step"));
        assert!(matches!(
            fs.read_file("/a.step"),
            Err(KernelError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_unique_paths_differ() {
        let a = unique_path("stage", "step");
        let b = unique_path("/stage/", "step");
        assert_ne!(a, b);
        assert!(a.starts_with("/stage/") && a.ends_with(".step"));
        assert!(b.starts_with("/stage/") && !b.starts_with("/stage//"));
    }

    #[test]
    fn test_staged_file_unlinks_on_drop() {
        let fs = VirtualFs::new();
        let path = {
            let staged = StagedFile::create(&fs, unique_path("stage", "step"), vec![1, 2, 3]);
            assert!(fs.exists(staged.path()));
            assert_eq!(staged.read().unwrap(), vec![1, 2, 3]);
            staged.path().to_string()
        };
        assert!(!fs.exists(&path));
        assert!(fs.is_empty());
    }

    #[test]
    fn test_reserved_file_unlinks_after_external_write() {
        let fs = VirtualFs::new();
        {
            let reserved = StagedFile::reserve(&fs, "/export/out.glb".into());
            assert!(reserved.read().is_err());
            fs.write_file(reserved.path(), vec![9]);
            assert_eq!(fs.len(), 1);
        }
        assert!(fs.is_empty());
    }
}
