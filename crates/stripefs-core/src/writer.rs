//! Write path: capped sinks, fragment recording, and the round-robin
//! striping loop.

use std::sync::Arc;

use stripefs_catalog::{BlobWrite, Catalog};
use stripefs_error::{Result, StripeError, WriteError};
use tracing::{debug, trace};

use crate::descriptor::{DescriptorRecorder, Fragment, SharedDescriptor};
use crate::pool::{Handle, writer_pool};
use crate::ring::Ring;

/// Outcome of one capped write. `short` signals "this sink is full,
/// continue with a fresh sink", never a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteProgress {
    /// Bytes the sink actually accepted.
    pub written: usize,
    /// The per-fragment budget was reached (the input was truncated, or
    /// the budget was already spent).
    pub short: bool,
}

/// Wraps one sink and rejects or truncates writes beyond a fixed
/// remaining-byte budget.
pub struct CappedWriter<W> {
    sink: W,
    limit: usize,
}

impl<W: BlobWrite> CappedWriter<W> {
    #[must_use]
    pub fn new(sink: W, limit: usize) -> Self {
        Self { sink, limit }
    }

    /// Budget still available.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.limit
    }

    /// Write within the budget. A spent budget yields `{0, short}` and
    /// forwards nothing; an input longer than the budget is truncated
    /// and `short` rides along even though the truncated write itself
    /// succeeded. The budget shrinks by the bytes actually written.
    pub fn write(&mut self, buf: &[u8]) -> Result<WriteProgress> {
        if self.limit == 0 {
            return Ok(WriteProgress {
                written: 0,
                short: true,
            });
        }

        let short = buf.len() > self.limit;
        let window = if short { &buf[..self.limit] } else { buf };
        let written = self.sink.write(window)?;
        self.limit -= written;
        Ok(WriteProgress { written, short })
    }
}

/// Wraps one pooled blob stream; every successful write appends a
/// `{location, length}` fragment to the shared descriptor.
pub struct RecordingSink {
    handle: Handle<Box<dyn BlobWrite>>,
    location: String,
    recorder: DescriptorRecorder,
}

impl RecordingSink {
    #[must_use]
    pub fn new(
        handle: Handle<Box<dyn BlobWrite>>,
        location: impl Into<String>,
        recorder: DescriptorRecorder,
    ) -> Self {
        Self {
            handle,
            location: location.into(),
            recorder,
        }
    }

    /// Catalog reference this sink writes to.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }
}

impl BlobWrite for RecordingSink {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let written = self.handle.lock().write(buf)?;
        // A failing blob write accepts zero bytes by contract, so an Err
        // above has nothing to record; the recorder itself drops n == 0.
        self.recorder.record(Fragment {
            location: self.location.clone(),
            length: written as u64,
        });
        Ok(written)
    }
}

/// Round-robin striping writer.
///
/// The loop has no notion of backend count or fragment size; both are
/// baked into the ring and the per-step budget it was constructed with,
/// so the same loop serves any striping width.
pub struct FragmentWriter {
    ring: Ring<RecordingSink>,
    fragment_len: usize,
    descriptor: SharedDescriptor,
}

impl FragmentWriter {
    /// Assemble from pre-wired sinks.
    ///
    /// # Panics
    ///
    /// Panics if `sinks` is empty (zero configured backends is a
    /// precondition violation, not a per-write error).
    #[must_use]
    pub fn new(
        sinks: Vec<RecordingSink>,
        fragment_len: usize,
        descriptor: SharedDescriptor,
    ) -> Self {
        Self {
            ring: Ring::new(sinks),
            fragment_len,
            descriptor,
        }
    }

    /// Open `fanout` fresh uniquely-named blobs in `catalog`, wire each
    /// through a recording sink, and assemble the ring.
    ///
    /// A `fragment_len` of zero is accepted here and makes every write
    /// fail with [`StripeError::NoSpaceToWrite`].
    ///
    /// # Panics
    ///
    /// Panics if `fanout` is zero (ring construction).
    pub fn over_catalog(
        catalog: Arc<dyn Catalog>,
        fragment_len: usize,
        fanout: usize,
        descriptor: SharedDescriptor,
    ) -> Result<Self> {
        let pool = writer_pool(catalog);
        let recorder = DescriptorRecorder::new(Arc::clone(&descriptor));
        let session: u64 = rand::random();

        let mut sinks = Vec::with_capacity(fanout);
        for index in 0..fanout {
            let location = format!("{session:016x}-{index}");
            let handle = pool.get(&location)?;
            sinks.push(RecordingSink::new(handle, location, recorder.clone()));
        }
        debug!(fanout, fragment_len, "fragment writer session opened");
        Ok(Self::new(sinks, fragment_len, descriptor))
    }

    /// The descriptor this writer is filling.
    #[must_use]
    pub fn descriptor(&self) -> SharedDescriptor {
        Arc::clone(&self.descriptor)
    }

    /// Stripe `buf` across the ring until it is consumed.
    ///
    /// Each ring step gets a fresh budget of one fragment length; a
    /// short-write signal advances to the next sink with the remaining
    /// input. Any real error stops the loop and reports the bytes
    /// written so far alongside the cause. A zero-length input is a
    /// no-op.
    pub fn write(&mut self, mut buf: &[u8]) -> Result<usize, WriteError> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.fragment_len == 0 {
            return Err(StripeError::NoSpaceToWrite.after_writing(0));
        }

        let mut written = 0_usize;
        while !buf.is_empty() {
            let sink = self.ring.next();
            let mut capped = CappedWriter::new(sink, self.fragment_len);
            match capped.write(buf) {
                Ok(progress) => {
                    written += progress.written;
                    buf = &buf[progress.written..];
                }
                Err(source) => return Err(source.after_writing(written)),
            }
        }
        trace!(written, "fragment write call complete");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FileDescriptor;
    use parking_lot::Mutex;
    use stripefs_catalog::{MemoryCatalog, StegoCatalog};

    struct CountingSink {
        accepted: Vec<u8>,
    }

    impl BlobWrite for CountingSink {
        fn write(&mut self, buf: &[u8]) -> Result<usize> {
            self.accepted.extend_from_slice(buf);
            Ok(buf.len())
        }
    }

    struct FailingSink;

    impl BlobWrite for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> Result<usize> {
            Err(StripeError::CapacityExceeded {
                requested: 1,
                remaining: 0,
            })
        }
    }

    fn boxed_handle(sink: impl BlobWrite + 'static) -> Handle<Box<dyn BlobWrite>> {
        Arc::new(Mutex::new(Box::new(sink) as Box<dyn BlobWrite>))
    }

    #[test]
    fn capped_writer_truncates_and_signals_short() {
        let mut capped = CappedWriter::new(
            CountingSink {
                accepted: Vec::new(),
            },
            4,
        );

        let progress = capped.write(b"abcdef").unwrap();
        assert_eq!(progress.written, 4);
        assert!(progress.short);
        assert_eq!(capped.remaining(), 0);

        // Budget spent: nothing forwarded, just the signal.
        let progress = capped.write(b"gh").unwrap();
        assert_eq!(progress.written, 0);
        assert!(progress.short);
        assert_eq!(capped.sink.accepted, b"abcd");
    }

    #[test]
    fn capped_writer_spends_budget_across_calls() {
        let mut capped = CappedWriter::new(
            CountingSink {
                accepted: Vec::new(),
            },
            10,
        );

        let progress = capped.write(b"abc").unwrap();
        assert_eq!(progress.written, 3);
        assert!(!progress.short);
        assert_eq!(capped.remaining(), 7);

        let progress = capped.write(b"defg").unwrap();
        assert_eq!(progress.written, 4);
        assert!(!progress.short);
        assert_eq!(capped.remaining(), 3);
    }

    #[test]
    fn recording_sink_appends_fragments() {
        let shared = FileDescriptor::new().into_shared();
        let mut sink = RecordingSink::new(
            boxed_handle(CountingSink {
                accepted: Vec::new(),
            }),
            "loc-0",
            DescriptorRecorder::new(Arc::clone(&shared)),
        );

        sink.write(b"abc").unwrap();
        sink.write(b"de").unwrap();

        let desc = shared.lock();
        assert_eq!(desc.fragments.len(), 2);
        assert_eq!(desc.fragments[0].location, "loc-0");
        assert_eq!(desc.fragments[0].length, 3);
        assert_eq!(desc.fragments[1].length, 2);
    }

    #[test]
    fn recording_sink_records_nothing_on_failure() {
        let shared = FileDescriptor::new().into_shared();
        let mut sink = RecordingSink::new(
            boxed_handle(FailingSink),
            "loc-0",
            DescriptorRecorder::new(Arc::clone(&shared)),
        );

        assert!(sink.write(b"abc").is_err());
        assert!(shared.lock().is_empty());
    }

    #[test]
    fn stripes_round_robin_across_backends() {
        let catalog = Arc::new(MemoryCatalog::new());
        let descriptor = FileDescriptor::new().into_shared();
        let mut writer =
            FragmentWriter::over_catalog(catalog, 3, 3, Arc::clone(&descriptor)).unwrap();

        let text = b"Lorem ipsum dolor sit amet";
        let written = writer.write(text).unwrap();
        assert_eq!(written, text.len());

        let desc = descriptor.lock();
        assert_eq!(desc.total_len(), text.len() as u64, "conservation");
        for (i, fragment) in desc.fragments.iter().enumerate() {
            assert!(
                fragment.location.ends_with(&format!("-{}", i % 3)),
                "fragment {i} landed on {}",
                fragment.location
            );
            assert!(fragment.length <= 3);
        }
    }

    #[test]
    fn consecutive_writes_continue_the_rotation() {
        let catalog = Arc::new(MemoryCatalog::new());
        let descriptor = FileDescriptor::new().into_shared();
        let mut writer =
            FragmentWriter::over_catalog(catalog, 2, 2, Arc::clone(&descriptor)).unwrap();

        writer.write(b"ab").unwrap();
        writer.write(b"cd").unwrap();

        let desc = descriptor.lock();
        assert!(desc.fragments[0].location.ends_with("-0"));
        assert!(
            desc.fragments[1].location.ends_with("-1"),
            "second call starts where the first left off"
        );
    }

    #[test]
    fn empty_input_is_a_noop() {
        let catalog = Arc::new(MemoryCatalog::new());
        let descriptor = FileDescriptor::new().into_shared();
        let mut writer =
            FragmentWriter::over_catalog(catalog, 3, 2, Arc::clone(&descriptor)).unwrap();

        assert_eq!(writer.write(b"").unwrap(), 0);
        assert!(descriptor.lock().is_empty());
    }

    #[test]
    fn zero_fragment_length_fails_every_write() {
        let catalog = Arc::new(MemoryCatalog::new());
        let descriptor = FileDescriptor::new().into_shared();
        let mut writer =
            FragmentWriter::over_catalog(catalog, 0, 10, Arc::clone(&descriptor)).unwrap();

        let err = writer.write(b"text").unwrap_err();
        assert_eq!(err.written, 0);
        assert!(matches!(err.source, StripeError::NoSpaceToWrite));

        // And again: the condition is permanent for this writer.
        let err = writer.write(b"more").unwrap_err();
        assert!(matches!(err.source, StripeError::NoSpaceToWrite));
    }

    #[test]
    #[should_panic(expected = "zero slots")]
    fn zero_fanout_is_a_precondition_violation() {
        let catalog = Arc::new(MemoryCatalog::new());
        let descriptor = FileDescriptor::new().into_shared();
        let _writer = FragmentWriter::over_catalog(catalog, 3, 0, descriptor);
    }

    #[test]
    fn backend_error_stops_with_partial_count() {
        // 4x1 carriers hold 2 bytes each; one backend fills after two
        // one-byte fragments and the third write step fails.
        let catalog = Arc::new(StegoCatalog::new(4, 1));
        let descriptor = FileDescriptor::new().into_shared();
        let mut writer =
            FragmentWriter::over_catalog(catalog, 1, 1, Arc::clone(&descriptor)).unwrap();

        let err = writer.write(b"abc").unwrap_err();
        assert_eq!(err.written, 2);
        assert!(matches!(err.source, StripeError::CapacityExceeded { .. }));
        assert_eq!(descriptor.lock().total_len(), 2);
    }
}
