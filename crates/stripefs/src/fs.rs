//! Virtual-filesystem facade: descriptors exposed as openable files.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use stripefs_catalog::Catalog;
use stripefs_core::{DescriptorPool, FragmentReader, FragmentWriter, ReadOutcome};
use stripefs_error::{ReadError, Result, StripeError, WriteError};
use tracing::debug;

/// A name-addressed view over striped files: each name maps to a
/// descriptor in the registry and to the catalog its fragments live in.
#[derive(Default)]
pub struct StripeFs {
    descriptors: DescriptorPool,
    catalogs: RwLock<HashMap<String, Arc<dyn Catalog>>>,
}

impl StripeFs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the catalog backing `name`.
    pub fn mount(&self, name: impl Into<String>, catalog: Arc<dyn Catalog>) {
        self.catalogs.write().insert(name.into(), catalog);
    }

    /// The descriptor registry behind this view.
    #[must_use]
    pub fn descriptors(&self) -> &DescriptorPool {
        &self.descriptors
    }

    fn catalog_for(&self, name: &str) -> Result<Arc<dyn Catalog>> {
        self.catalogs
            .read()
            .get(name)
            .map(Arc::clone)
            .ok_or_else(|| StripeError::not_found(name))
    }

    /// Stripe `bytes` into the catalog mounted at `name` and register
    /// the resulting descriptor under that name.
    pub fn store(
        &self,
        name: &str,
        bytes: &[u8],
        fragment_len: usize,
        fanout: usize,
    ) -> Result<usize, WriteError> {
        let catalog = self.catalog_for(name).map_err(|e| e.after_writing(0))?;
        let descriptor = self.descriptors.get(name);
        let mut writer = FragmentWriter::over_catalog(catalog, fragment_len, fanout, descriptor)
            .map_err(|e| e.after_writing(0))?;
        let written = writer.write(bytes)?;
        debug!(name, written, "stored striped file");
        Ok(written)
    }

    /// Open `name` for reading.
    ///
    /// Fails with `NotFound` if no descriptor or catalog is registered
    /// under the name, and with `EmptyDescriptor` (before any handle
    /// exists) if the descriptor has zero fragments, the canonical
    /// broken state.
    pub fn open(&self, name: &str) -> Result<StripeFile> {
        let catalog = self.catalog_for(name)?;
        let descriptor = self
            .descriptors
            .find(name)
            .ok_or_else(|| StripeError::not_found(name))?;
        let snapshot = descriptor.lock().clone();
        if snapshot.is_empty() {
            return Err(StripeError::EmptyDescriptor {
                name: name.to_owned(),
            });
        }

        let len = snapshot.total_len();
        Ok(StripeFile {
            inner: FragmentReader::over_catalog(catalog, snapshot),
            len,
        })
    }
}

/// A readable striped file: a fragment reader plus the length its
/// descriptor promises.
pub struct StripeFile {
    inner: FragmentReader,
    len: u64,
}

impl std::fmt::Debug for StripeFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeFile")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl StripeFile {
    /// Total stream length recorded in the descriptor.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// See [`FragmentReader::read`].
    pub fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome, ReadError> {
        self.inner.read(buf)
    }

    /// Drain the remaining stream into `out`.
    pub fn read_to_end(&mut self, out: &mut Vec<u8>) -> Result<usize, ReadError> {
        self.inner.read_to_end(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stripefs_core::Fragment;
    use stripefs_catalog::MemoryCatalog;

    fn mounted_fs() -> StripeFs {
        let fs = StripeFs::new();
        fs.mount("notes", Arc::new(MemoryCatalog::new()));
        fs
    }

    #[test]
    fn store_then_open_round_trips() {
        let fs = mounted_fs();
        let written = fs.store("notes", b"to be reassembled", 4, 3).unwrap();
        assert_eq!(written, 17);

        let mut file = fs.open("notes").unwrap();
        assert_eq!(file.len(), 17);

        let mut out = Vec::new();
        file.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"to be reassembled");
    }

    #[test]
    fn open_unknown_name_is_not_found() {
        let fs = mounted_fs();
        assert!(matches!(
            fs.open("notes").unwrap_err(),
            StripeError::NotFound { .. }
        ));
        assert!(matches!(
            fs.open("unmounted").unwrap_err(),
            StripeError::NotFound { .. }
        ));
    }

    #[test]
    fn open_rejects_empty_descriptors() {
        let fs = mounted_fs();
        // Registered but never written: zero fragments.
        let _descriptor = fs.descriptors().get("notes");

        assert!(matches!(
            fs.open("notes").unwrap_err(),
            StripeError::EmptyDescriptor { .. }
        ));
    }

    #[test]
    fn open_does_not_create_descriptors() {
        let fs = mounted_fs();
        let _ = fs.open("notes");
        assert!(
            !fs.descriptors().contains("notes"),
            "open must not have the get-or-create side effect"
        );
    }

    #[test]
    fn store_into_unmounted_name_fails() {
        let fs = StripeFs::new();
        let err = fs.store("nowhere", b"bytes", 4, 2).unwrap_err();
        assert_eq!(err.written, 0);
        assert!(matches!(err.source, StripeError::NotFound { .. }));
    }

    #[test]
    fn broken_descriptor_surfaces_not_found_mid_read() {
        let fs = mounted_fs();
        fs.store("notes", b"abcdefgh", 2, 2).unwrap();
        fs.descriptors().get("notes").lock().fragments[1] = Fragment {
            location: "gone".to_owned(),
            length: 2,
        };

        let mut file = fs.open("notes").unwrap();
        let mut buf = [0_u8; 16];
        let err = file.read(&mut buf).unwrap_err();
        assert_eq!(err.filled, 2);
        assert!(matches!(err.source, StripeError::NotFound { .. }));
    }
}
