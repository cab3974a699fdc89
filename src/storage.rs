//! File I/O used by [`FileFormat`](crate::format::FileFormat)

use std::fs;
use std::path::Path;

use crate::error::{FormatError, Result};

/// Where documents are read from and written to
pub trait Storage {
    /// All lines of the file, without their terminators
    fn read_lines(&self, path: &Path) -> Result<Vec<String>>;

    /// Replace the file's content with `content`
    fn write_string(&self, path: &Path, content: &str) -> Result<()>;
}

/// [`Storage`] over the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl Storage for FsStorage {
    fn read_lines(&self, path: &Path) -> Result<Vec<String>> {
        let content = fs::read_to_string(path).map_err(|e| FormatError::io(path, e))?;
        Ok(content.lines().map(str::to_string).collect())
    }

    fn write_string(&self, path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| FormatError::io(parent, e))?;
        }
        fs::write(path, content).map_err(|e| FormatError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("doc.txt");

        FsStorage.write_string(&path, "a:1\n  b:2\n").unwrap();
        assert_eq!(FsStorage.read_lines(&path).unwrap(), vec!["a:1", "  b:2"]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp = TempDir::new().unwrap();
        let err = FsStorage.read_lines(&temp.path().join("absent.txt")).unwrap_err();
        assert!(matches!(err, FormatError::Io { .. }));
    }
}
