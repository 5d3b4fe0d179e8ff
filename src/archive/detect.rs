//! Plain/packed classification for Glue archives.
//!
//! Nothing in a Glue file says whether its entry table is stored as-is or
//! inside the LZ payload. A packed archive read as a plain table yields
//! garbage that fails one of a few sanity checks, so an archive is plain
//! exactly when its table survives them.

use tracing::debug;

use super::structures::{GLUE_NAME_LEN, GLUE_ROW_BOUND};
use crate::error::{ArchiveError, Result};
use crate::io::{ByteStream, ReadAt};

/// Characters a Glue entry name may contain
fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'.' || b == b'_'
}

/// Report whether the Glue archive behind `stream` is packed.
///
/// The cursor is back at its entry position when this returns, whatever
/// the outcome. A read failure during the table walk is reported as
/// [`ArchiveError::CorruptArchive`].
pub async fn is_packed<R: ReadAt + ?Sized>(stream: &mut ByteStream<R>) -> Result<bool> {
    let start = stream.position();
    let verdict = walk_table(stream).await;
    stream.seek(start)?;

    verdict.map_err(|err| match err {
        ArchiveError::Io(e) => {
            ArchiveError::corrupt(format!("failed to read entry table while probing: {e}"))
        }
        other => other,
    })
}

async fn walk_table<R: ReadAt + ?Sized>(stream: &mut ByteStream<R>) -> Result<bool> {
    stream.seek(0)?;
    let total = stream.len();
    let count = stream.read_u16_le().await?;

    // The claimed table has to fit
    if u64::from(count) * GLUE_ROW_BOUND >= total {
        debug!(count, total, "entry table cannot fit, treating archive as packed");
        return Ok(true);
    }

    for index in 0..count {
        let name = stream.read_array::<GLUE_NAME_LEN>().await?;
        if let Some(&bad) = name
            .iter()
            .take_while(|&&b| b != 0)
            .find(|&&b| !is_name_byte(b))
        {
            debug!(index, byte = bad, "unexpected name byte, treating archive as packed");
            return Ok(true);
        }

        let size = stream.read_u32_le().await?;
        let offset = stream.read_u32_le().await?;

        // The entry has to fit
        if u64::from(size) + u64::from(offset) > total {
            debug!(index, size, offset, total, "entry out of range, treating archive as packed");
            return Ok(true);
        }
    }

    Ok(false)
}
