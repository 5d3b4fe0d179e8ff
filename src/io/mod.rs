mod local;
mod memory;
mod sink;
mod stream;

pub use local::LocalFileReader;
pub use memory::MemoryReader;
pub use sink::{DirectorySink, FileSink};
pub use stream::ByteStream;

use async_trait::async_trait;
use std::io;

/// Trait for random access reading from a data source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    ///
    /// Returns the number of bytes read, which is zero at or past the end.
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Fill the whole buffer from `offset`, failing with `UnexpectedEof` if
    /// the source ends first
    async fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_at(offset + filled as u64, &mut buf[filled..]).await?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "needed {} bytes at offset {}, source ends at {}",
                        buf.len(),
                        offset,
                        self.size()
                    ),
                ));
            }
            filled += n;
        }
        Ok(())
    }
}
