use std::io::Write;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{ArchiveError, Result};
use crate::io::{ByteStream, FileSink, MemoryReader, ReadAt};

use super::structures::{ArchiveEntry, ArchiveKind, Command, EntryTable};
use super::{detect, lz, parser};

/// Opened archive: the working byte source plus its entry table
pub struct ArchiveExtractor {
    source: Arc<dyn ReadAt>,
    kind: ArchiveKind,
    packed: bool,
    entries: EntryTable,
}

/// Outcome of extracting every entry of an archive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub extracted: usize,
    pub failed: usize,
}

impl ArchiveExtractor {
    /// Open an archive and read its entry table.
    ///
    /// Glue archives are probed first; a packed one is unpacked into memory
    /// and the rest of the work happens on the unpacked buffer. TND archives
    /// have their size header checked before anything else is read.
    pub async fn open(reader: Arc<dyn ReadAt>, kind: ArchiveKind) -> Result<Self> {
        let mut stream = ByteStream::new(reader);
        let mut packed = false;

        if kind == ArchiveKind::Glue && detect::is_packed(&mut stream).await? {
            let unpacked = lz::unpack(stream.reader().as_ref()).await?;
            stream = ByteStream::new(Arc::new(MemoryReader::new(unpacked)) as Arc<dyn ReadAt>);
            packed = true;
        }

        let count = parser::read_entry_count(&mut stream, kind).await?;
        let entries = parser::read_table(&mut stream, count, kind).await?;

        info!(
            %kind,
            packed,
            entries = entries.len(),
            size = stream.len(),
            "opened archive"
        );

        Ok(Self {
            source: stream.reader().clone(),
            kind,
            packed,
            entries,
        })
    }

    pub fn kind(&self) -> ArchiveKind {
        self.kind
    }

    /// Whether the entry table came out of an LZ payload
    pub fn is_packed(&self) -> bool {
        self.packed
    }

    /// List all entries in the archive
    pub fn entries(&self) -> &EntryTable {
        &self.entries
    }

    /// Length of the source entry ranges are read from
    pub fn source_len(&self) -> u64 {
        self.source.size()
    }

    /// Read an entry's bytes into memory
    ///
    /// An entry whose range does not lie inside the working source is an
    /// [`ArchiveError::Extraction`] error; ranges are never clamped.
    pub async fn read_entry(&self, entry: &ArchiveEntry) -> Result<Vec<u8>> {
        let len = self.source.size();
        if entry.end() > len {
            return Err(extraction_error(
                entry,
                format!(
                    "range {}..{} lies outside the {} byte archive",
                    entry.offset,
                    entry.end(),
                    len
                ),
            ));
        }

        let mut buf = vec![0u8; entry.size as usize];
        self.source
            .read_exact_at(u64::from(entry.offset), &mut buf)
            .await
            .map_err(|e| extraction_error(entry, e.to_string()))?;

        Ok(buf)
    }

    /// Extract one entry into `sink` under its own name
    pub async fn extract_entry<S: FileSink + ?Sized>(
        &self,
        entry: &ArchiveEntry,
        sink: &S,
    ) -> Result<()> {
        let data = self.read_entry(entry).await?;
        sink.create_and_write(&entry.name.to_os_str(), &data)
            .await
            .map_err(|e| extraction_error(entry, e.to_string()))
    }

    /// Write the listing table for every entry
    pub fn list<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "Number of files: {}", self.entries.len())?;
        writeln!(out)?;
        writeln!(out, " Filename    | Size")?;
        writeln!(out, "=============|===========")?;

        for entry in &self.entries {
            writeln!(out, "{:>12} | {:>10}", entry.name, entry.size)?;
        }

        Ok(())
    }

    /// Extract every entry in table order, reporting progress to `out`.
    ///
    /// A failing entry is reported and skipped; the remaining entries are
    /// still attempted.
    pub async fn extract_all<S, W>(&self, sink: &S, out: &mut W) -> Result<ExtractionSummary>
    where
        S: FileSink + ?Sized,
        W: Write + ?Sized,
    {
        let total = self.entries.len();
        let mut summary = ExtractionSummary::default();

        writeln!(out, "Number of files: {total}")?;
        writeln!(out)?;

        for (i, entry) in self.entries.iter().enumerate() {
            write!(out, "Extracting {}/{}: \"{}\"... ", i + 1, total, entry.name)?;
            out.flush()?;

            match self.extract_entry(entry, sink).await {
                Ok(()) => {
                    writeln!(out, "done")?;
                    summary.extracted += 1;
                }
                Err(err) => {
                    warn!(index = i + 1, error = %err, "entry not extracted");
                    writeln!(out, "FAILED")?;
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }
}

fn extraction_error(entry: &ArchiveEntry, reason: String) -> ArchiveError {
    ArchiveError::Extraction {
        name: entry.name.to_string(),
        reason,
    }
}

/// Open the archive behind `reader` and carry out `command` on it.
///
/// # Arguments
///
/// * `reader` - The raw archive file
/// * `kind` - Which archive family to read it as
/// * `command` - List the entries or extract them
/// * `sink` - Where extracted entries go (unused when listing)
/// * `out` - Receives the listing or the extraction progress
///
/// # Returns
///
/// The extraction tally; a listing reports every entry as neither extracted
/// nor failed.
pub async fn run<S, W>(
    reader: Arc<dyn ReadAt>,
    kind: ArchiveKind,
    command: Command,
    sink: &S,
    out: &mut W,
) -> Result<ExtractionSummary>
where
    S: FileSink + ?Sized,
    W: Write + ?Sized,
{
    let extractor = ArchiveExtractor::open(reader, kind).await?;

    match command {
        Command::List => {
            extractor.list(out)?;
            Ok(ExtractionSummary::default())
        }
        Command::Extract => extractor.extract_all(sink, out).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::ffi::OsStr;
    use std::sync::Mutex;

    /// Sink that records every attempt and fails the ones listed
    #[derive(Default)]
    struct RecordingSink {
        fail_on: Vec<usize>,
        calls: Mutex<Vec<(String, Vec<u8>)>>,
    }

    #[async_trait]
    impl FileSink for RecordingSink {
        async fn create_and_write(&self, name: &OsStr, data: &[u8]) -> std::io::Result<()> {
            let mut calls = self.calls.lock().unwrap();
            calls.push((name.to_string_lossy().into_owned(), data.to_vec()));
            if self.fail_on.contains(&calls.len()) {
                return Err(std::io::Error::other("disk full"));
            }
            Ok(())
        }
    }

    /// Plain Glue image with rows pointing into a data region at `base`
    fn glue(rows: &[(&str, u32, u32)], data: &[u8]) -> Vec<u8> {
        let mut out = (rows.len() as u16).to_le_bytes().to_vec();
        for (name, size, offset) in rows {
            let mut field = [0u8; 12];
            field[..name.len()].copy_from_slice(name.as_bytes());
            out.extend_from_slice(&field);
            out.extend_from_slice(&size.to_le_bytes());
            out.extend_from_slice(&offset.to_le_bytes());
        }
        out.extend_from_slice(data);
        out
    }

    fn reader(bytes: Vec<u8>) -> Arc<dyn ReadAt> {
        Arc::new(MemoryReader::new(bytes))
    }

    #[tokio::test]
    async fn lists_plain_archive_in_table_order() {
        let base = 2 + 2 * 20;
        let image = glue(&[("B.TXT", 4, base), ("A.TXT", 6, base + 4)], b"0123456789");

        let mut out = Vec::new();
        let summary = run(
            reader(image),
            ArchiveKind::Glue,
            Command::List,
            &RecordingSink::default(),
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(summary, ExtractionSummary::default());
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Number of files: 2\n\n Filename    | Size\n=============|===========\n       B.TXT |          4\n       A.TXT |          6\n"
        );
    }

    #[tokio::test]
    async fn extraction_continues_after_a_failed_write() {
        let base = 2 + 3 * 20;
        let image = glue(
            &[("ONE", 1, base), ("TWO", 2, base + 1), ("THREE", 3, base + 3)],
            b"abbccc",
        );
        let sink = RecordingSink {
            fail_on: vec![1],
            ..Default::default()
        };

        let mut out = Vec::new();
        let summary = run(reader(image), ArchiveKind::Glue, Command::Extract, &sink, &mut out)
            .await
            .unwrap();

        assert_eq!(summary, ExtractionSummary { extracted: 2, failed: 1 });

        let calls = sink.calls.lock().unwrap();
        let names: Vec<_> = calls.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["ONE", "TWO", "THREE"]);
        assert_eq!(calls[1].1, b"bb");
        assert_eq!(calls[2].1, b"ccc");

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Extracting 1/3: \"ONE\"... FAILED\n"));
        assert!(text.contains("Extracting 3/3: \"THREE\"... done\n"));
    }

    #[tokio::test]
    async fn entry_outside_source_fails_alone() {
        // A TND table whose second entry claims more bytes than exist
        let mut image = 0u32.to_be_bytes().to_vec();
        image.extend_from_slice(&2u32.to_be_bytes());
        for (name, size, rel) in [(&b"GOOD"[..], 2u32, 0u32), (&b"BAD"[..], 50, 2)] {
            let mut field = [0u8; 8];
            field[..name.len()].copy_from_slice(name);
            image.extend_from_slice(&field);
            image.extend_from_slice(&size.to_be_bytes());
            image.extend_from_slice(&rel.to_be_bytes());
        }
        image.extend_from_slice(b"okxx");
        let total = image.len() as u32;
        image[..4].copy_from_slice(&total.to_be_bytes());

        let extractor = ArchiveExtractor::open(reader(image), ArchiveKind::Tnd)
            .await
            .unwrap();
        let bad = *extractor.entries().get(1).unwrap();
        assert!(matches!(
            extractor.read_entry(&bad).await,
            Err(ArchiveError::Extraction { .. })
        ));

        let sink = RecordingSink::default();
        let summary = extractor.extract_all(&sink, &mut Vec::new()).await.unwrap();
        assert_eq!(summary, ExtractionSummary { extracted: 1, failed: 1 });
        assert_eq!(sink.calls.lock().unwrap()[0], ("GOOD.TXT".to_string(), b"ok".to_vec()));
    }

    #[tokio::test]
    async fn packed_archive_is_read_from_unpacked_buffer() {
        // Unpacked image: one entry covering the tail of the buffer
        let total = 1920usize;
        let table_end = 2 + 20;
        let mut plain = glue(&[("PAYLOAD.BIN", (total - table_end) as u32, table_end as u32)], &[]);
        plain.extend((0..total - table_end).map(|i| (i % 200) as u8 + 1));
        assert_eq!(plain.len(), total);

        // Literal-only LZ stream, one full chunk of 120 blocks
        let mut packed = Vec::new();
        for payload in plain.chunks(16) {
            packed.push(0xFF);
            packed.extend_from_slice(payload);
        }
        packed.resize(lz::CHUNK_SIZE, 0);
        packed[lz::SIZE_FIELD_OFFSET..lz::SIZE_FIELD_OFFSET + 4]
            .copy_from_slice(&((total as u64 - lz::SIZE_BIAS) as u32).to_le_bytes());

        let extractor = ArchiveExtractor::open(reader(packed), ArchiveKind::Glue)
            .await
            .unwrap();
        assert!(extractor.is_packed());
        assert_eq!(extractor.source_len(), total as u64);

        let entry = *extractor.entries().get(0).unwrap();
        assert_eq!(entry.name.as_bytes(), b"PAYLOAD.BIN");
        assert_eq!(extractor.read_entry(&entry).await.unwrap(), &plain[table_end..]);
    }

    #[tokio::test]
    async fn tnd_header_is_checked_before_the_table() {
        let image = vec![0, 0, 0, 99, 0, 0, 0, 1];
        let err = ArchiveExtractor::open(reader(image), ArchiveKind::Tnd)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ArchiveError::InvalidHeader(_)));
    }
}
