//! # ds2arc
//!
//! Readers for the resource archives of *Dark Seed II*.
//!
//! The game ships two archive families:
//!
//! - **Glue** archives, whose entry table is either stored in the clear or
//!   hidden inside an LZ-packed payload
//! - **TND** archives, holding the game's text with a self-checking header
//!
//! This crate lists and extracts both. Packed Glue archives are recognised
//! heuristically and unpacked into memory before their table is read.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use ds2arc::{ArchiveExtractor, ArchiveKind, DirectorySink, LocalFileReader};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let reader = Arc::new(LocalFileReader::new(Path::new("GLUE.GLU"))?);
//!     let extractor = ArchiveExtractor::open(reader, ArchiveKind::Glue).await?;
//!
//!     for entry in extractor.entries() {
//!         println!("{} ({} bytes)", entry.name, entry.size);
//!     }
//!
//!     extractor
//!         .extract_all(&DirectorySink::new("out"), &mut std::io::stdout())
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cli;
pub mod error;
pub mod io;

pub use archive::{ArchiveEntry, ArchiveExtractor, ArchiveKind, Command, EntryName, EntryTable};
pub use cli::Cli;
pub use error::{ArchiveError, Result};
pub use io::{ByteStream, DirectorySink, FileSink, LocalFileReader, MemoryReader, ReadAt};
