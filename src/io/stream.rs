//! Cursor over a [`ReadAt`] source.
//!
//! The archive formats are laid out for sequential reading from the start of
//! the file, so the detector and the table parser work through a
//! [`ByteStream`] that tracks a read position on top of the positional
//! reader.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::sync::Arc;

use super::ReadAt;
use crate::error::Result;

/// Seekable read cursor over a shared byte source
pub struct ByteStream<R: ReadAt + ?Sized> {
    reader: Arc<R>,
    pos: u64,
}

impl<R: ReadAt + ?Sized> ByteStream<R> {
    /// Create a stream positioned at the start of `reader`
    pub fn new(reader: Arc<R>) -> Self {
        Self { reader, pos: 0 }
    }

    /// Total length of the underlying source
    pub fn len(&self) -> u64 {
        self.reader.size()
    }

    /// Current read position
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Bytes left between the cursor and the end of the source
    pub fn remaining(&self) -> u64 {
        self.len().saturating_sub(self.pos)
    }

    /// Move the cursor to `pos`, which may be anywhere in `[0, len]`
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        if pos > self.len() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("cannot seek to {} in a {} byte source", pos, self.len()),
            )
            .into());
        }
        self.pos = pos;
        Ok(())
    }

    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    /// The shared source this stream reads from
    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }

    /// Read `n` bytes and advance the cursor past them
    pub async fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.read_into(&mut buf).await?;
        Ok(buf)
    }

    /// Read a fixed-size field and advance the cursor past it
    pub async fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.read_into(&mut buf).await?;
        Ok(buf)
    }

    pub async fn read_u16_le(&mut self) -> Result<u16> {
        let buf = self.read_array::<2>().await?;
        Ok(LittleEndian::read_u16(&buf))
    }

    pub async fn read_u32_le(&mut self) -> Result<u32> {
        let buf = self.read_array::<4>().await?;
        Ok(LittleEndian::read_u32(&buf))
    }

    pub async fn read_u32_be(&mut self) -> Result<u32> {
        let buf = self.read_array::<4>().await?;
        Ok(BigEndian::read_u32(&buf))
    }

    async fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        self.reader.read_exact_at(self.pos, buf).await?;
        self.pos += buf.len() as u64;
        Ok(())
    }
}
