//! In-memory catalog: one growable byte buffer per reference.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use stripefs_error::{Result, StripeError};
use tracing::trace;

use crate::{BlobRead, BlobWrite, Catalog};

type Entry = Arc<RwLock<Vec<u8>>>;

/// A [`Catalog`] that stores every blob in process memory.
///
/// Opening a blob snapshots its bytes: writes that land after the open
/// are not visible through that reader. The engine's sessions write a
/// descriptor fully before reading it back, so the snapshot is the
/// natural semantics.
#[derive(Default)]
pub struct MemoryCatalog {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Catalog for MemoryCatalog {
    fn open(&self, reference: &str) -> Result<Box<dyn BlobRead>> {
        let entries = self.entries.read();
        let entry = entries
            .get(reference)
            .ok_or_else(|| StripeError::not_found(reference))?;
        Ok(Box::new(MemoryReader {
            data: entry.read().clone(),
            pos: 0,
        }))
    }

    fn create(&self, reference: &str) -> Result<Box<dyn BlobWrite>> {
        let mut entries = self.entries.write();
        if entries.contains_key(reference) {
            return Err(StripeError::already_exists(reference));
        }
        let entry = Entry::default();
        entries.insert(reference.to_owned(), Arc::clone(&entry));
        trace!(reference, "memory catalog created blob");
        Ok(Box::new(MemoryWriter { entry }))
    }

    fn remove(&self, reference: &str) -> Result<()> {
        if self.entries.write().remove(reference).is_none() {
            return Err(StripeError::not_found(reference));
        }
        Ok(())
    }

    fn rename(&self, old: &str, new: &str) -> Result<()> {
        let mut entries = self.entries.write();
        let entry = entries
            .remove(old)
            .ok_or_else(|| StripeError::not_found(old))?;
        entries.insert(new.to_owned(), entry);
        Ok(())
    }

    fn exists(&self, reference: &str) -> Result<bool> {
        Ok(self.entries.read().contains_key(reference))
    }
}

/// Read cursor over a snapshot taken at open time.
struct MemoryReader {
    data: Vec<u8>,
    pos: usize,
}

impl BlobRead for MemoryReader {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let remaining = &self.data[self.pos..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }
}

/// Appends into the shared entry; the entry outlives the handle.
struct MemoryWriter {
    entry: Entry,
}

impl BlobWrite for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.entry.write().extend_from_slice(buf);
        Ok(buf.len())
    }
}
