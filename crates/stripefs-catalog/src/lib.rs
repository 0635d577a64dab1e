//! Storage backend boundary for stripefs.
//!
//! A [`Catalog`] is a primitive addressable store: blobs are created,
//! opened, removed, and renamed by an opaque reference string. The
//! fragmentation engine never sees past this trait; anything that can
//! hand out byte streams per reference can back a striped file.
//!
//! Blob streams are deliberately minimal capabilities: [`BlobRead`] and
//! [`BlobWrite`] each carry one method. Closing is `Drop`: a handle
//! releases its backend resource when it goes out of scope.

pub mod dir;
pub mod mem;
pub mod stego;

pub use dir::DirCatalog;
pub use mem::MemoryCatalog;
pub use stego::{StegoBlob, StegoCatalog};

use stripefs_error::Result;

/// A readable blob stream. `Ok(0)` on a non-empty buffer means the blob
/// is exhausted.
pub trait BlobRead: Send {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// A writable blob stream. Returns the bytes accepted; a failing write
/// accepts zero bytes and mutates nothing.
pub trait BlobWrite: Send {
    fn write(&mut self, buf: &[u8]) -> Result<usize>;
}

impl core::fmt::Debug for dyn BlobRead {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("dyn BlobRead")
    }
}

impl core::fmt::Debug for dyn BlobWrite {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("dyn BlobWrite")
    }
}

impl<T: BlobRead + ?Sized> BlobRead for &mut T {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }
}

impl<T: BlobRead + ?Sized> BlobRead for Box<T> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }
}

impl<T: BlobWrite + ?Sized> BlobWrite for &mut T {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }
}

impl<T: BlobWrite + ?Sized> BlobWrite for Box<T> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }
}

/// An addressable store of blobs, keyed by opaque reference strings.
pub trait Catalog: Send + Sync {
    /// Open an existing blob for reading. Fails with
    /// [`StripeError::NotFound`](stripefs_error::StripeError::NotFound)
    /// if the reference is unknown.
    fn open(&self, reference: &str) -> Result<Box<dyn BlobRead>>;

    /// Create a new blob for writing. Fails with
    /// [`StripeError::AlreadyExists`](stripefs_error::StripeError::AlreadyExists)
    /// if the reference is already in use.
    fn create(&self, reference: &str) -> Result<Box<dyn BlobWrite>>;

    /// Remove an existing blob. Fails with `NotFound` if the reference is
    /// unknown.
    fn remove(&self, reference: &str) -> Result<()>;

    /// Move a blob from `old` to `new`, replacing any blob already at
    /// `new`. Fails with `NotFound` if `old` is unknown.
    fn rename(&self, old: &str, new: &str) -> Result<()>;

    /// Whether a blob exists at `reference`.
    fn exists(&self, reference: &str) -> Result<bool>;
}
