//! Archive header and entry table parsing.
//!
//! Both archive families store their table as fixed-width rows right after
//! a small header:
//!
//! | family | header                                  | row (bytes)                         |
//! |--------|-----------------------------------------|-------------------------------------|
//! | Glue   | u16 LE count                            | name 12, size u32 LE, offset u32 LE |
//! | TND    | u32 BE archive size, u32 BE count       | name 8, size u32 BE, offset u32 BE  |
//!
//! Glue offsets are absolute. TND offsets are relative to the data region
//! that starts right after the table, and TND names get a `.TXT` suffix.
//!
//! The whole table is fetched with one read and decoded from memory.

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

use crate::error::{ArchiveError, Result};
use crate::io::{ByteStream, ReadAt};

use super::structures::*;

/// Read the entry count, leaving the stream at the first table row.
///
/// For TND archives this also performs the header self-check: the declared
/// archive size must equal the length of the source.
///
/// # Errors
///
/// Returns [`ArchiveError::InvalidHeader`] if a TND header is missing or
/// disagrees with the source length.
pub async fn read_entry_count<R: ReadAt + ?Sized>(
    stream: &mut ByteStream<R>,
    kind: ArchiveKind,
) -> Result<u32> {
    stream.seek(0)?;

    match kind {
        ArchiveKind::Glue => Ok(u32::from(stream.read_u16_le().await?)),
        ArchiveKind::Tnd => {
            check_tnd_header(stream).await?;
            Ok(stream.read_u32_be().await?)
        }
    }
}

/// Compare the TND size field against the source length
async fn check_tnd_header<R: ReadAt + ?Sized>(stream: &mut ByteStream<R>) -> Result<()> {
    let actual = stream.len();
    if actual < TND_HEADER_SIZE as u64 {
        return Err(ArchiveError::InvalidHeader(format!(
            "{actual} bytes is too short for a TND header"
        )));
    }

    let declared = stream.read_u32_be().await?;
    if u64::from(declared) != actual {
        return Err(ArchiveError::InvalidHeader(format!(
            "TND header declares {declared} bytes, file has {actual}"
        )));
    }

    Ok(())
}

/// Offset of the TND data region for a table of `count` rows
pub fn tnd_data_start(count: u32) -> u64 {
    u64::from(count) * TND_ROW_SIZE as u64 + TND_HEADER_SIZE as u64
}

/// Read `count` table rows starting at the stream's cursor.
///
/// # Arguments
///
/// * `stream` - Stream positioned at the first row
/// * `count` - Number of rows, as read by [`read_entry_count`]
/// * `kind` - Archive family deciding the row layout
///
/// # Returns
///
/// The entries in on-disk order; the table always holds `count` entries.
///
/// # Errors
///
/// Returns [`ArchiveError::CorruptArchive`] if the table would run past the
/// end of the source.
pub async fn read_table<R: ReadAt + ?Sized>(
    stream: &mut ByteStream<R>,
    count: u32,
    kind: ArchiveKind,
) -> Result<EntryTable> {
    let table_len = u64::from(count) * kind.row_size() as u64;
    if table_len > stream.remaining() {
        return Err(ArchiveError::corrupt(format!(
            "{count} entries need {table_len} bytes of table, only {} left",
            stream.remaining()
        )));
    }

    let data = stream.read_bytes(table_len as usize).await?;
    parse_rows(&data, count, kind)
}

/// Decode `count` rows of an in-memory table
pub fn parse_rows(data: &[u8], count: u32, kind: ArchiveKind) -> Result<EntryTable> {
    let mut cursor = Cursor::new(data);
    let mut table = EntryTable::with_capacity(count as usize);

    for _ in 0..count {
        let entry = match kind {
            ArchiveKind::Glue => parse_glue_row(&mut cursor)?,
            ArchiveKind::Tnd => parse_tnd_row(&mut cursor, tnd_data_start(count))?,
        };
        table.push(entry);
    }

    Ok(table)
}

fn parse_glue_row(cursor: &mut Cursor<&[u8]>) -> Result<ArchiveEntry> {
    let mut name = [0u8; GLUE_NAME_LEN];
    cursor.read_exact(&mut name)?;

    let size = cursor.read_u32::<LittleEndian>()?;
    let offset = cursor.read_u32::<LittleEndian>()?;

    Ok(ArchiveEntry {
        name: EntryName::from_field(&name),
        offset,
        size,
    })
}

fn parse_tnd_row(cursor: &mut Cursor<&[u8]>, data_start: u64) -> Result<ArchiveEntry> {
    let mut name = [0u8; TND_NAME_LEN];
    cursor.read_exact(&mut name)?;
    let name = EntryName::from_field(&name).with_suffix(TND_NAME_SUFFIX);

    let size = cursor.read_u32::<BigEndian>()?;
    let relative = cursor.read_u32::<BigEndian>()?;

    let offset = u32::try_from(u64::from(relative) + data_start).map_err(|_| {
        ArchiveError::corrupt(format!(
            "entry {name} starts beyond 4 GiB (relative offset {relative})"
        ))
    })?;

    Ok(ArchiveEntry { name, offset, size })
}
