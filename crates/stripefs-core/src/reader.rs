//! Read path: descriptor replay through bounded, pooled sources.

use std::sync::Arc;

use stripefs_catalog::{BlobRead, Catalog};
use stripefs_error::{ReadError, Result};
use tracing::trace;

use crate::descriptor::FileDescriptor;
use crate::pool::{Handle, ReaderPool, reader_pool};

/// Outcome of one read call. `end_of_stream` rides along with the last
/// partial read, so callers must check both the count and the signal on
/// every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Bytes copied into the caller's buffer.
    pub filled: usize,
    /// The descriptor's fragment list is exhausted.
    pub end_of_stream: bool,
}

/// One pooled blob stream bounded to a fragment's recorded length.
pub struct BoundedSource {
    handle: Handle<Box<dyn BlobRead>>,
    remaining: u64,
}

impl BoundedSource {
    /// Read at most the fragment bound. `Ok(0)` on a non-empty buffer
    /// means this fragment is done, either because the bound is spent or
    /// because the backend drained early.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let cap = usize::try_from(self.remaining)
            .unwrap_or(usize::MAX)
            .min(buf.len());
        if cap == 0 {
            return Ok(0);
        }
        let n = self.handle.lock().read(&mut buf[..cap])?;
        self.remaining -= n as u64;
        Ok(n)
    }
}

/// Walks a descriptor's fragment list once, in order, yielding one
/// bounded source per fragment.
///
/// The cursor only advances once a source opens: a fragment whose
/// location fails to resolve yields the error and is retried by the
/// next call rather than silently skipped.
pub struct FragmentReaderIterator {
    pool: Arc<ReaderPool>,
    descriptor: FileDescriptor,
    index: usize,
}

impl FragmentReaderIterator {
    #[must_use]
    pub fn new(pool: Arc<ReaderPool>, descriptor: FileDescriptor) -> Self {
        Self {
            pool,
            descriptor,
            index: 0,
        }
    }
}

impl Iterator for FragmentReaderIterator {
    type Item = Result<BoundedSource>;

    fn next(&mut self) -> Option<Self::Item> {
        let fragment = self.descriptor.fragments.get(self.index)?;
        match self.pool.get(&fragment.location) {
            Ok(handle) => {
                self.index += 1;
                Some(Ok(BoundedSource {
                    handle,
                    remaining: fragment.length,
                }))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

/// Reconstructs a logical stream by draining bounded sources in
/// descriptor order.
pub struct FragmentReader {
    sources: FragmentReaderIterator,
    current: Option<BoundedSource>,
    exhausted: bool,
}

impl FragmentReader {
    #[must_use]
    pub fn new(sources: FragmentReaderIterator) -> Self {
        Self {
            sources,
            current: None,
            exhausted: false,
        }
    }

    /// Convenience constructor wiring a fresh reader pool over `catalog`.
    #[must_use]
    pub fn over_catalog(catalog: Arc<dyn Catalog>, descriptor: FileDescriptor) -> Self {
        let pool = Arc::new(reader_pool(catalog));
        Self::new(FragmentReaderIterator::new(pool, descriptor))
    }

    /// Fill `buf` from the stream, transparently spanning fragment
    /// boundaries within one call.
    ///
    /// Once the fragment list is exhausted and room remains in `buf`,
    /// the outcome carries `end_of_stream` together with the bytes
    /// produced; every later call returns `{0, end_of_stream}`. A
    /// backend failure aborts immediately with the bytes filled so far;
    /// nothing is retried. The recorded fragment length is trusted as
    /// the bound; a source that drains early simply ends its fragment.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome, ReadError> {
        let mut filled = 0_usize;
        while !self.exhausted && filled < buf.len() {
            match &mut self.current {
                Some(source) => match source.read(&mut buf[filled..]) {
                    Ok(0) => self.current = None,
                    Ok(n) => filled += n,
                    Err(cause) => return Err(cause.after_filling(filled)),
                },
                None => match self.sources.next() {
                    Some(Ok(source)) => self.current = Some(source),
                    Some(Err(cause)) => return Err(cause.after_filling(filled)),
                    None => {
                        self.exhausted = true;
                        trace!(filled, "fragment stream exhausted");
                    }
                },
            }
        }

        Ok(ReadOutcome {
            filled,
            end_of_stream: self.exhausted && filled < buf.len(),
        })
    }

    /// Drain the remaining stream into `out`, returning the bytes
    /// appended.
    pub fn read_to_end(&mut self, out: &mut Vec<u8>) -> Result<usize, ReadError> {
        let mut total = 0_usize;
        let mut chunk = [0_u8; 8192];
        loop {
            let outcome = self.read(&mut chunk).map_err(|mut err| {
                err.filled += total;
                err
            })?;
            out.extend_from_slice(&chunk[..outcome.filled]);
            total += outcome.filled;
            if outcome.end_of_stream {
                return Ok(total);
            }
        }
    }
}
