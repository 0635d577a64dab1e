//! Directory-backed catalog: one file per reference under a root path.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use stripefs_error::{Result, StripeError};
use tracing::trace;

use crate::{BlobRead, BlobWrite, Catalog};

/// A [`Catalog`] that stores each blob as a plain file in one directory.
///
/// References map directly to file names, so callers must hand out
/// references that are valid path components (the engine's generated
/// references are hex tags and always are).
pub struct DirCatalog {
    root: PathBuf,
}

impl DirCatalog {
    /// Use `root` as the blob directory, creating it if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, reference: &str) -> PathBuf {
        self.root.join(reference)
    }
}

fn map_not_found(err: std::io::Error, reference: &str) -> StripeError {
    if err.kind() == std::io::ErrorKind::NotFound {
        StripeError::not_found(reference)
    } else {
        StripeError::Io(err)
    }
}

impl Catalog for DirCatalog {
    fn open(&self, reference: &str) -> Result<Box<dyn BlobRead>> {
        let file =
            File::open(self.path_for(reference)).map_err(|e| map_not_found(e, reference))?;
        Ok(Box::new(FileReader { file }))
    }

    fn create(&self, reference: &str) -> Result<Box<dyn BlobWrite>> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path_for(reference))
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    StripeError::already_exists(reference)
                } else {
                    StripeError::Io(e)
                }
            })?;
        trace!(reference, root = %self.root.display(), "dir catalog created blob");
        Ok(Box::new(FileWriter { file }))
    }

    fn remove(&self, reference: &str) -> Result<()> {
        fs::remove_file(self.path_for(reference)).map_err(|e| map_not_found(e, reference))
    }

    fn rename(&self, old: &str, new: &str) -> Result<()> {
        fs::rename(self.path_for(old), self.path_for(new)).map_err(|e| map_not_found(e, old))
    }

    fn exists(&self, reference: &str) -> Result<bool> {
        Ok(self.path_for(reference).exists())
    }
}

struct FileReader {
    file: File,
}

impl BlobRead for FileReader {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.file.read(buf)?)
    }
}

struct FileWriter {
    file: File,
}

impl BlobWrite for FileWriter {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.file.write_all(buf)?;
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = DirCatalog::new(dir.path()).unwrap();

        catalog.create("frag-0").unwrap().write(b"on disk").unwrap();
        let mut buf = [0_u8; 16];
        let n = catalog.open("frag-0").unwrap().read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"on disk");
    }

    #[test]
    fn create_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = DirCatalog::new(dir.path()).unwrap();
        let _writer = catalog.create("frag-0").unwrap();
        assert!(matches!(
            catalog.create("frag-0").unwrap_err(),
            StripeError::AlreadyExists { .. }
        ));
    }

    #[test]
    fn missing_file_maps_to_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = DirCatalog::new(dir.path()).unwrap();
        assert!(matches!(
            catalog.open("nope").unwrap_err(),
            StripeError::NotFound { .. }
        ));
        assert!(matches!(
            catalog.remove("nope").unwrap_err(),
            StripeError::NotFound { .. }
        ));
        assert!(!catalog.exists("nope").unwrap());
    }

    #[test]
    fn rename_moves_the_blob() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = DirCatalog::new(dir.path()).unwrap();
        catalog.create("old").unwrap().write(b"x").unwrap();
        catalog.rename("old", "new").unwrap();
        assert!(!catalog.exists("old").unwrap());
        assert!(catalog.exists("new").unwrap());
    }
}
