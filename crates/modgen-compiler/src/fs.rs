//! File system access used by the generator.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::diagnostic::GeneratorError;

/// Reads and writes whole text files.
pub trait FileSystem {
    /// Returns `None` if the file does not exist.
    fn read_text(&self, path: &Path) -> Result<Option<String>, GeneratorError>;

    /// Writes `contents`, creating parent directories as needed.
    fn write_text(&mut self, path: &Path, contents: &str) -> Result<(), GeneratorError>;
}

impl<T: FileSystem + ?Sized> FileSystem for Box<T> {
    fn read_text(&self, path: &Path) -> Result<Option<String>, GeneratorError> {
        (**self).read_text(path)
    }

    fn write_text(&mut self, path: &Path, contents: &str) -> Result<(), GeneratorError> {
        (**self).write_text(path, contents)
    }
}

fn read_from_disk(path: &Path) -> Result<Option<String>, GeneratorError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(GeneratorError::read(path, e.to_string())),
    }
}

/// The real file system.
#[derive(Debug, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read_text(&self, path: &Path) -> Result<Option<String>, GeneratorError> {
        read_from_disk(path)
    }

    fn write_text(&mut self, path: &Path, contents: &str) -> Result<(), GeneratorError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GeneratorError::write(parent, e.to_string()))?;
        }
        std::fs::write(path, contents).map_err(|e| GeneratorError::write(path, e.to_string()))?;
        debug!(path = %path.display(), bytes = contents.len(), "wrote file");
        Ok(())
    }
}

/// Reads from disk but keeps writes in memory.
///
/// Later reads of a written path see the recorded contents, so a dry run
/// behaves like a real one.
#[derive(Debug, Default)]
pub struct DryRunFileSystem {
    writes: Vec<(PathBuf, String)>,
}

impl DryRunFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes that would have happened, in order.
    pub fn writes(&self) -> &[(PathBuf, String)] {
        &self.writes
    }
}

impl FileSystem for DryRunFileSystem {
    fn read_text(&self, path: &Path) -> Result<Option<String>, GeneratorError> {
        match self.writes.iter().rev().find(|(p, _)| p == path) {
            Some((_, content)) => Ok(Some(content.clone())),
            None => read_from_disk(path),
        }
    }

    fn write_text(&mut self, path: &Path, contents: &str) -> Result<(), GeneratorError> {
        debug!(path = %path.display(), "dry run: skipped write");
        self.writes.push((path.to_path_buf(), contents.to_string()));
        Ok(())
    }
}

/// An in-memory file system.
#[derive(Debug, Default, Clone)]
pub struct MemoryFileSystem {
    files: BTreeMap<PathBuf, String>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }

    pub fn get(&self, path: &Path) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_text(&self, path: &Path) -> Result<Option<String>, GeneratorError> {
        Ok(self.files.get(path).cloned())
    }

    fn write_text(&mut self, path: &Path, contents: &str) -> Result<(), GeneratorError> {
        self.files.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_os_write_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("src/api/admin/wipers/route.ts");
        let mut fs = OsFileSystem;

        assert_eq!(fs.read_text(&path).unwrap(), None);
        fs.write_text(&path, "export {}\n").unwrap();
        assert_eq!(fs.read_text(&path).unwrap().as_deref(), Some("export {}\n"));
    }

    #[test]
    fn test_dry_run_never_touches_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("middlewares.ts");
        let mut fs = DryRunFileSystem::new();

        fs.write_text(&path, "first").unwrap();
        fs.write_text(&path, "second").unwrap();

        assert!(!path.exists());
        assert_eq!(fs.read_text(&path).unwrap().as_deref(), Some("second"));
        assert_eq!(fs.writes().len(), 2);
    }
}
