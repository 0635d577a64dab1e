//! Lazy handle cache keyed by catalog reference.
//!
//! Backend resources are opened on first use and shared by every later
//! request for the same reference. The double-checked insertion keeps
//! the invariant that at most one handle exists per distinct reference:
//! two concurrent misses race to the write lock, the loser re-checks and
//! reuses the winner's handle without ever invoking the constructor.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use stripefs_catalog::{BlobRead, BlobWrite, Catalog};
use stripefs_error::Result;
use tracing::trace;

/// A pooled handle. The mutex serializes stream access; the pool and any
/// sinks built on it share the same underlying resource.
pub type Handle<T> = Arc<Mutex<T>>;

type Constructor<T> = Box<dyn Fn(&str) -> Result<T> + Send + Sync>;

/// Generic lazy cache mapping a reference to an opened handle.
///
/// Constructor failures propagate to the caller and are not cached: the
/// next `get` for that reference tries again. The pool never retries on
/// its own. Dropping a handle (via [`remove`](Self::remove) or
/// [`clear`](Self::clear), once every sink holding it is gone) closes
/// the backend resource.
pub struct ResourcePool<T> {
    entries: RwLock<HashMap<String, Handle<T>>>,
    construct: Constructor<T>,
}

impl<T> ResourcePool<T> {
    pub fn new(construct: impl Fn(&str) -> Result<T> + Send + Sync + 'static) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            construct: Box::new(construct),
        }
    }

    /// Get the handle for `reference`, constructing it on first use.
    pub fn get(&self, reference: &str) -> Result<Handle<T>> {
        if let Some(handle) = self.entries.read().get(reference) {
            return Ok(Arc::clone(handle));
        }

        let mut entries = self.entries.write();
        // Double-checked: another caller may have constructed while we
        // waited for the write lock.
        if let Some(handle) = entries.get(reference) {
            return Ok(Arc::clone(handle));
        }

        let handle = Arc::new(Mutex::new((self.construct)(reference)?));
        entries.insert(reference.to_owned(), Arc::clone(&handle));
        trace!(reference, "resource pool constructed handle");
        Ok(handle)
    }

    /// Drop the cached handle for `reference` if present; no-op
    /// otherwise.
    pub fn remove(&self, reference: &str) {
        self.entries.write().remove(reference);
    }

    /// Drop every cached handle.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of distinct handles currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Pool of readable blob streams, one per fragment location.
pub type ReaderPool = ResourcePool<Box<dyn BlobRead>>;

/// Pool of writable blob streams, one per striping target.
pub type WriterPool = ResourcePool<Box<dyn BlobWrite>>;

/// A [`ReaderPool`] that opens blobs from `catalog` on demand.
#[must_use]
pub fn reader_pool(catalog: Arc<dyn Catalog>) -> ReaderPool {
    ResourcePool::new(move |reference| catalog.open(reference))
}

/// A [`WriterPool`] that creates fresh blobs in `catalog` on demand.
#[must_use]
pub fn writer_pool(catalog: Arc<dyn Catalog>) -> WriterPool {
    ResourcePool::new(move |reference| catalog.create(reference))
}
