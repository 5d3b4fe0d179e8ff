//! Dark Seed II archive reading and extraction.
//!
//! ## Architecture
//!
//! - [`structures`]: entry, name and table types, the on-disk constants
//!   and the [`Command`] to run on an archive
//! - [`detect`]: tells plain Glue archives from packed ones
//! - [`lz`]: unpacks packed Glue archives into memory
//! - [`parser`]: reads headers and entry tables
//! - [`extractor`]: ties the above together and copies entries out
//!
//! ## Formats
//!
//! A **Glue** archive starts with its entry table, unless the whole file is
//! LZ-packed, in which case the table is the start of the unpacked payload.
//! There is no flag telling the two apart; see [`detect`].
//!
//! A **TND** archive carries its own size as its first field, followed by
//! the entry count and a table whose offsets are relative to the data that
//! follows it. TND archives are never packed.

pub mod detect;
pub mod lz;
pub mod parser;
mod extractor;
mod structures;

pub use extractor::{run, ArchiveExtractor, ExtractionSummary};
pub use structures::*;
