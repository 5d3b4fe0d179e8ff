use std::io;
use thiserror::Error;

/// Result type for archive operations
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Errors raised while reading, decoding or extracting an archive
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid archive header: {0}")]
    InvalidHeader(String),

    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("Failed to extract \"{name}\": {reason}")]
    Extraction { name: String, reason: String },
}

impl ArchiveError {
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        ArchiveError::CorruptArchive(msg.into())
    }

    /// Process exit code used by the command-line tools for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            ArchiveError::Io(_) => 2,
            ArchiveError::InvalidHeader(_) => 3,
            ArchiveError::CorruptArchive(_) => 4,
            ArchiveError::Extraction { .. } => 1,
        }
    }
}
