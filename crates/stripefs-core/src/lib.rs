//! Fragmentation engine for stripefs.
//!
//! The write path stripes a byte stream into fixed-length fragments,
//! fanned out round-robin across a pool of lazily-opened catalog blobs,
//! and records the resulting layout in a [`FileDescriptor`]. The read
//! path replays the descriptor against the same catalog to reconstruct
//! the original stream.
//!
//! Write path: caller → [`FragmentWriter`] → [`Ring`] → [`CappedWriter`]
//! → [`RecordingSink`] → [`WriterPool`] → catalog create.
//! Read path: caller → [`FragmentReader`] → [`FragmentReaderIterator`]
//! → [`ReaderPool`] → catalog open, each source bounded to its
//! fragment's recorded length.

pub mod descriptor;
pub mod pool;
pub mod reader;
pub mod registry;
pub mod ring;
pub mod writer;

pub use descriptor::{DescriptorRecorder, FileDescriptor, Fragment, SharedDescriptor};
pub use pool::{ReaderPool, ResourcePool, WriterPool, reader_pool, writer_pool};
pub use reader::{BoundedSource, FragmentReader, FragmentReaderIterator, ReadOutcome};
pub use registry::DescriptorPool;
pub use ring::Ring;
pub use writer::{CappedWriter, FragmentWriter, RecordingSink, WriteProgress};
