use async_trait::async_trait;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Destination for extracted entries
///
/// Every call stands alone: a failure is returned to the caller for that one
/// entry and never poisons later calls.
#[async_trait]
pub trait FileSink: Send + Sync {
    /// Create (or truncate) the file `name` and write `data` into it
    async fn create_and_write(&self, name: &OsStr, data: &[u8]) -> io::Result<()>;
}

/// Writes extracted entries as files inside one directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Sink writing into the process' working directory
    pub fn current_dir() -> Self {
        Self::new(".")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Archive names are bare file names; anything that could address another
/// directory is refused.
fn is_bare_file_name(name: &OsStr) -> bool {
    let bytes = name.as_encoded_bytes();
    !bytes.is_empty()
        && bytes != b"."
        && bytes != b".."
        && !bytes.iter().any(|&b| matches!(b, b'/' | b'\\' | 0))
}

#[async_trait]
impl FileSink for DirectorySink {
    async fn create_and_write(&self, name: &OsStr, data: &[u8]) -> io::Result<()> {
        if !is_bare_file_name(name) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("refusing to write entry name {name:?} outside the output directory"),
            ));
        }

        if !self.root.as_os_str().is_empty() {
            fs::create_dir_all(&self.root).await?;
        }

        let mut file = fs::File::create(self.root.join(name)).await?;
        file.write_all(data).await?;
        file.flush().await?;

        Ok(())
    }
}
