//! Decoder for the LZ variant packed Glue archives are stored in.
//!
//! ## Stream layout
//!
//! The packed file is a run of 2048-byte chunks; only the last may be
//! shorter. The first chunk carries the unpacked size as a u32 LE at offset
//! 2044, stored 128 less than the real figure.
//!
//! Each chunk is a sequence of 17-byte blocks: one control byte followed by
//! eight 2-byte operations. Control bits are consumed least significant
//! first:
//!
//! - set: the two bytes are literal output;
//! - clear: the two bytes are a u16 LE token, `distance = (token >> 4) + 1`
//!   and `length = (token & 0xF) + 3`, copying `length` bytes from
//!   `distance` bytes back in the output.
//!
//! A full chunk holds 120 blocks; its last 8 bytes are never decoded. A
//! short final chunk is rounded up to whole blocks, the missing bytes
//! reading as zero.

use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;

use crate::error::{ArchiveError, Result};
use crate::io::ReadAt;

/// Size of one input chunk
pub const CHUNK_SIZE: usize = 2048;
/// Control byte + 8 two-byte operations
pub const BLOCK_SIZE: usize = 17;
/// Bytes decoded from a full chunk
pub const FULL_CHUNK_USABLE: usize = (CHUNK_SIZE / BLOCK_SIZE) * BLOCK_SIZE;
/// Offset of the unpacked size field in the first chunk
pub const SIZE_FIELD_OFFSET: usize = 2044;
/// Constant added to the stored unpacked size
pub const SIZE_BIAS: u64 = 128;
/// Unpacked sizes at or above this are taken as a garbage header
pub const MAX_DECODED_SIZE: u64 = 10 * 1024 * 1024;

/// Back-references always copy this many bytes first...
const BURST_HEAD: usize = 8;
/// ...and this many more when the length exceeds the first burst
const BURST_TAIL: usize = 10;
/// Slack kept behind the declared size for burst overrun
const MAX_BURST: usize = BURST_HEAD + BURST_TAIL;

/// High byte of the control mask; it runs out after exactly 8 shifts
const CONTROL_SENTINEL: u16 = 0xFF00;

/// Chunk buffer big enough for a short chunk rounded up to whole blocks
const PADDED_CHUNK_SIZE: usize = CHUNK_SIZE.div_ceil(BLOCK_SIZE) * BLOCK_SIZE;

/// Unpacked size declared by the first chunk of a packed stream.
///
/// Fails if `first_chunk` is not a complete chunk or the size is
/// implausibly large.
pub fn declared_size(first_chunk: &[u8]) -> Result<usize> {
    if first_chunk.len() < CHUNK_SIZE {
        return Err(ArchiveError::corrupt(format!(
            "packed stream shorter than one {CHUNK_SIZE} byte chunk ({} bytes)",
            first_chunk.len()
        )));
    }

    let stored = LittleEndian::read_u32(&first_chunk[SIZE_FIELD_OFFSET..SIZE_FIELD_OFFSET + 4]);
    let size = u64::from(stored) + SIZE_BIAS;
    if size >= MAX_DECODED_SIZE {
        return Err(ArchiveError::corrupt(format!(
            "declared unpacked size {size} is implausible"
        )));
    }

    Ok(size as usize)
}

/// Number of input bytes decoded from a chunk of `read` bytes
pub fn usable_len(read: usize) -> usize {
    if read == CHUNK_SIZE {
        FULL_CHUNK_USABLE
    } else {
        read.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
    }
}

/// Incremental decoder writing into a buffer sized from the stream header
pub struct LzDecoder {
    out: Vec<u8>,
    cursor: usize,
    declared: usize,
}

impl LzDecoder {
    /// Prepare to produce exactly `declared` bytes
    pub fn new(declared: usize) -> Result<Self> {
        if declared as u64 >= MAX_DECODED_SIZE {
            return Err(ArchiveError::corrupt(format!(
                "declared unpacked size {declared} is implausible"
            )));
        }

        Ok(Self {
            out: vec![0; declared + MAX_BURST],
            cursor: 0,
            declared,
        })
    }

    /// Bytes produced so far
    pub fn written(&self) -> usize {
        self.cursor
    }

    /// Decode the whole blocks in `input`; a trailing partial block is
    /// ignored, callers pad it out first.
    ///
    /// Returns the number of bytes this chunk produced.
    pub fn decode_chunk(&mut self, input: &[u8]) -> Result<usize> {
        let before = self.cursor;
        for block in input.chunks_exact(BLOCK_SIZE) {
            self.decode_block(block)?;
        }
        Ok(self.cursor - before)
    }

    fn decode_block(&mut self, block: &[u8]) -> Result<()> {
        let mut mask = CONTROL_SENTINEL | u16::from(block[0]);
        let mut ops = block[1..].chunks_exact(2);

        while mask & CONTROL_SENTINEL != 0 {
            let literal = mask & 1 != 0;
            mask >>= 1;

            let Some(op) = ops.next() else { break };
            if literal {
                self.copy_literal(op)?;
            } else {
                self.copy_back_reference(LittleEndian::read_u16(op))?;
            }
        }

        Ok(())
    }

    fn copy_literal(&mut self, pair: &[u8]) -> Result<()> {
        let end = self.cursor + pair.len();
        if end > self.declared {
            return Err(self.overflow(end));
        }
        self.out[self.cursor..end].copy_from_slice(pair);
        self.cursor = end;
        Ok(())
    }

    fn copy_back_reference(&mut self, token: u16) -> Result<()> {
        let distance = usize::from(token >> 4) + 1;
        let length = usize::from(token & 0xF) + 3;

        if distance > self.cursor {
            return Err(ArchiveError::corrupt(format!(
                "back-reference {distance} bytes back from output offset {}",
                self.cursor
            )));
        }
        let end = self.cursor + length;
        if end > self.declared {
            return Err(self.overflow(end));
        }

        // Fixed bursts, forward byte by byte so overlapping runs repeat.
        // Bytes past `length` land in space the next operation overwrites.
        let burst = if length > BURST_HEAD {
            BURST_HEAD + BURST_TAIL
        } else {
            BURST_HEAD
        };
        let src = self.cursor - distance;
        for i in 0..burst {
            self.out[self.cursor + i] = self.out[src + i];
        }

        self.cursor = end;
        Ok(())
    }

    fn overflow(&self, end: usize) -> ArchiveError {
        ArchiveError::corrupt(format!(
            "packed stream runs to {end} bytes, past its declared size {}",
            self.declared
        ))
    }

    /// Finish decoding; the output must be exactly the declared size
    pub fn finish(mut self) -> Result<Vec<u8>> {
        if self.cursor != self.declared {
            return Err(ArchiveError::corrupt(format!(
                "packed stream produced {} bytes, header declares {}",
                self.cursor, self.declared
            )));
        }
        self.out.truncate(self.declared);
        Ok(self.out)
    }
}

/// Unpack a whole packed Glue archive into memory
pub async fn unpack<R: ReadAt + ?Sized>(reader: &R) -> Result<Vec<u8>> {
    let total = reader.size();
    let mut chunk = vec![0u8; PADDED_CHUNK_SIZE];

    let mut read = read_chunk(reader, 0, total, &mut chunk).await?;
    let mut decoder = LzDecoder::new(declared_size(&chunk[..read])?)?;
    debug!(total, declared = decoder.declared, "unpacking archive");

    let mut offset = 0u64;
    let mut chunks = 0usize;
    while read != 0 {
        decoder.decode_chunk(&chunk[..usable_len(read)])?;
        chunks += 1;

        offset += read as u64;
        chunk.fill(0);
        read = read_chunk(reader, offset, total, &mut chunk).await?;
    }

    debug!(chunks, written = decoder.written(), "unpacked archive");
    decoder.finish()
}

async fn read_chunk<R: ReadAt + ?Sized>(
    reader: &R,
    offset: u64,
    total: u64,
    chunk: &mut [u8],
) -> Result<usize> {
    let len = total.saturating_sub(offset).min(CHUNK_SIZE as u64) as usize;
    reader.read_exact_at(offset, &mut chunk[..len]).await?;
    Ok(len)
}
