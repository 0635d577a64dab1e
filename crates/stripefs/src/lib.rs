//! stripefs: round-robin fragment striping over pluggable storage
//! catalogs.
//!
//! A byte stream is cut into fixed-length fragments and fanned out
//! across a set of independently addressed backends; the resulting
//! layout is recorded in a descriptor that later replays the fragments
//! back into the original stream. Useful when a single backend holds
//! only a handful of bytes (a carrier image, say) and a logical file
//! has to spread across many of them.
//!
//! The [`fs`] module is the file-shaped view: mount a catalog per name,
//! [`StripeFs::store`] a byte slice, [`StripeFs::open`] it back.

pub mod fs;

pub use fs::{StripeFile, StripeFs};

pub use stripefs_catalog::{
    BlobRead, BlobWrite, Catalog, DirCatalog, MemoryCatalog, StegoBlob, StegoCatalog,
};
pub use stripefs_core::{
    BoundedSource, CappedWriter, DescriptorPool, DescriptorRecorder, FileDescriptor,
    FragmentReader, FragmentReaderIterator, FragmentWriter, Fragment, ReadOutcome, ReaderPool,
    RecordingSink, ResourcePool, Ring, SharedDescriptor, WriteProgress, WriterPool,
};
pub use stripefs_error::{ReadError, Result, StripeError, WriteError};
