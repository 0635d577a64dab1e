//! Bit-packed image store: bytes hidden in the least significant bit of
//! each pixel channel.
//!
//! Bit `i` of byte `b` lands at channel position `8*b + i` of the raw
//! RGBA buffer, so one byte occupies eight consecutive channels (two
//! pixels). Capacity is fixed by the image dimensions at construction:
//! `pixel_buffer_len / 8` bytes.

use std::sync::Arc;

use hashbrown::HashMap;
use image::RgbaImage;
use parking_lot::{Mutex, RwLock};
use stripefs_error::{Result, StripeError};
use tracing::trace;

use crate::{BlobRead, BlobWrite, Catalog};

/// Write `buf` into the LSBs starting at byte position `at`. The caller
/// has already checked capacity.
fn encode(pix: &mut [u8], at: usize, buf: &[u8]) {
    let mut channel = at * 8;
    for &byte in buf {
        for i in 0..8 {
            let bit = (byte >> i) & 1;
            pix[channel] = (pix[channel] & !1) | bit;
            channel += 1;
        }
    }
}

/// Reassemble bytes from the LSBs starting at byte position `at`.
fn decode(pix: &[u8], at: usize, buf: &mut [u8]) {
    let mut channel = at * 8;
    for byte in buf {
        let mut assembled = 0_u8;
        for i in 0..8 {
            assembled |= (pix[channel] & 1) << i;
            channel += 1;
        }
        *byte = assembled;
    }
}

fn byte_capacity(pix: &[u8]) -> usize {
    pix.len() / 8
}

/// A single image carrying hidden bytes, readable and writable as a
/// blob stream. Reads and writes keep independent cursors.
pub struct StegoBlob {
    image: RgbaImage,
    read_cursor: usize,
    write_cursor: usize,
}

impl StegoBlob {
    #[must_use]
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image,
            read_cursor: 0,
            write_cursor: 0,
        }
    }

    /// Fresh zeroed image of the given dimensions.
    #[must_use]
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self::new(RgbaImage::new(width, height))
    }

    /// Total bytes this image can carry.
    #[must_use]
    pub fn capacity(&self) -> usize {
        byte_capacity(self.image.as_raw())
    }

    /// Recover the carrier image.
    #[must_use]
    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

impl BlobWrite for StegoBlob {
    /// All-or-nothing: the capacity check covers the whole buffer before
    /// any pixel is touched, so a failing write leaves the image intact
    /// and accepts zero bytes.
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let remaining = self.capacity() - self.write_cursor;
        if buf.len() > remaining {
            return Err(StripeError::CapacityExceeded {
                requested: buf.len(),
                remaining,
            });
        }
        encode(&mut self.image, self.write_cursor, buf);
        self.write_cursor += buf.len();
        Ok(buf.len())
    }
}

impl BlobRead for StegoBlob {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let remaining = self.capacity() - self.read_cursor;
        let n = remaining.min(buf.len());
        decode(self.image.as_raw(), self.read_cursor, &mut buf[..n]);
        self.read_cursor += n;
        Ok(n)
    }
}

struct Cell {
    image: RgbaImage,
    write_cursor: usize,
}

type SharedCell = Arc<Mutex<Cell>>;

/// A [`Catalog`] that stores every blob inside a fresh zeroed image of
/// fixed dimensions. Useful when each backend can only hold a handful of
/// bytes and a logical file has to stripe across many of them.
pub struct StegoCatalog {
    width: u32,
    height: u32,
    cells: RwLock<HashMap<String, SharedCell>>,
}

impl StegoCatalog {
    /// Every created blob gets a `width` x `height` carrier image.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: RwLock::new(HashMap::new()),
        }
    }

    /// Byte capacity of each carrier image.
    #[must_use]
    pub fn capacity_per_blob(&self) -> usize {
        (self.width as usize * self.height as usize * 4) / 8
    }
}

impl Catalog for StegoCatalog {
    fn open(&self, reference: &str) -> Result<Box<dyn BlobRead>> {
        let cells = self.cells.read();
        let cell = cells
            .get(reference)
            .ok_or_else(|| StripeError::not_found(reference))?;
        Ok(Box::new(StegoReader {
            cell: Arc::clone(cell),
            read_cursor: 0,
        }))
    }

    fn create(&self, reference: &str) -> Result<Box<dyn BlobWrite>> {
        let mut cells = self.cells.write();
        if cells.contains_key(reference) {
            return Err(StripeError::already_exists(reference));
        }
        let cell = Arc::new(Mutex::new(Cell {
            image: RgbaImage::new(self.width, self.height),
            write_cursor: 0,
        }));
        cells.insert(reference.to_owned(), Arc::clone(&cell));
        trace!(
            reference,
            capacity = self.capacity_per_blob(),
            "stego catalog created carrier image"
        );
        Ok(Box::new(StegoWriter { cell }))
    }

    fn remove(&self, reference: &str) -> Result<()> {
        if self.cells.write().remove(reference).is_none() {
            return Err(StripeError::not_found(reference));
        }
        Ok(())
    }

    fn rename(&self, old: &str, new: &str) -> Result<()> {
        let mut cells = self.cells.write();
        let cell = cells
            .remove(old)
            .ok_or_else(|| StripeError::not_found(old))?;
        cells.insert(new.to_owned(), cell);
        Ok(())
    }

    fn exists(&self, reference: &str) -> Result<bool> {
        Ok(self.cells.read().contains_key(reference))
    }
}

struct StegoWriter {
    cell: SharedCell,
}

impl BlobWrite for StegoWriter {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let mut cell = self.cell.lock();
        let remaining = byte_capacity(cell.image.as_raw()) - cell.write_cursor;
        if buf.len() > remaining {
            return Err(StripeError::CapacityExceeded {
                requested: buf.len(),
                remaining,
            });
        }
        let at = cell.write_cursor;
        encode(&mut cell.image, at, buf);
        cell.write_cursor += buf.len();
        Ok(buf.len())
    }
}

/// Each open gets its own cursor over the shared carrier image.
struct StegoReader {
    cell: SharedCell,
    read_cursor: usize,
}

impl BlobRead for StegoReader {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let cell = self.cell.lock();
        let remaining = byte_capacity(cell.image.as_raw()) - self.read_cursor;
        let n = remaining.min(buf.len());
        decode(cell.image.as_raw(), self.read_cursor, &mut buf[..n]);
        self.read_cursor += n;
        Ok(n)
    }
}
