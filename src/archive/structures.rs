use clap::ValueEnum;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::fmt;

/// Glue entry name field width
pub const GLUE_NAME_LEN: usize = 12;
/// Glue table row: name + u32 size + u32 offset
pub const GLUE_ROW_SIZE: usize = GLUE_NAME_LEN + 4 + 4;
/// Per-entry size bound the format detector checks a claimed count against
pub const GLUE_ROW_BOUND: u64 = 22;

/// TND header: u32 declared archive size + u32 entry count
pub const TND_HEADER_SIZE: usize = 4 + 4;
/// TND entry name field width, before the suffix is appended
pub const TND_NAME_LEN: usize = 8;
/// TND table row: name + u32 size + u32 offset
pub const TND_ROW_SIZE: usize = TND_NAME_LEN + 4 + 4;
pub const TND_NAME_SUFFIX: &[u8] = b".TXT";

const ENTRY_NAME_CAPACITY: usize = 12;

/// What to do with an opened archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Command {
    /// List archive contents
    #[value(name = "l")]
    List,
    /// Extract files to the current directory
    #[value(name = "x")]
    Extract,
}

impl Command {
    /// Look a command up by its command-line spelling
    pub fn from_arg(arg: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(arg, false).ok()
    }
}

/// The two archive families shipped with the game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// Resource archives whose entry table may sit inside an LZ payload
    Glue,
    /// Text archives with a self-describing size header
    Tnd,
}

impl ArchiveKind {
    pub fn row_size(&self) -> usize {
        match self {
            ArchiveKind::Glue => GLUE_ROW_SIZE,
            ArchiveKind::Tnd => TND_ROW_SIZE,
        }
    }

    /// Name of the command-line tool handling this family
    pub fn tool_name(&self) -> &'static str {
        match self {
            ArchiveKind::Glue => "unglue",
            ArchiveKind::Tnd => "untnd",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ArchiveKind::Glue => "Dark Seed II Glue archive extractor",
            ArchiveKind::Tnd => "Dark Seed II TND archive extractor",
        }
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveKind::Glue => f.write_str("Glue"),
            ArchiveKind::Tnd => f.write_str("TND"),
        }
    }
}

/// Entry name of at most [`EntryName::MAX_LEN`] bytes
///
/// On disk names live in fixed-width fields that are NUL-padded when
/// shorter than the field and unterminated when they fill it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EntryName {
    bytes: [u8; ENTRY_NAME_CAPACITY],
    len: u8,
}

impl EntryName {
    pub const MAX_LEN: usize = ENTRY_NAME_CAPACITY;

    /// Take the bytes of a fixed-width field up to the first NUL, or the
    /// whole field if it has none. Anything past `MAX_LEN` is dropped.
    pub fn from_field(field: &[u8]) -> Self {
        let end = field
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(field.len())
            .min(Self::MAX_LEN);

        let mut bytes = [0u8; Self::MAX_LEN];
        bytes[..end].copy_from_slice(&field[..end]);
        Self {
            bytes,
            len: end as u8,
        }
    }

    /// Append `suffix`, truncating at `MAX_LEN`
    pub fn with_suffix(mut self, suffix: &[u8]) -> Self {
        let start = self.len as usize;
        let take = suffix.len().min(Self::MAX_LEN - start);
        self.bytes[start..start + take].copy_from_slice(&suffix[..take]);
        self.len += take as u8;
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }

    /// The name as a file name, with its raw bytes
    #[cfg(unix)]
    pub fn to_os_str(&self) -> Cow<'_, OsStr> {
        use std::os::unix::ffi::OsStrExt;
        Cow::Borrowed(OsStr::from_bytes(self.as_bytes()))
    }

    /// The name as a file name; bytes that are not UTF-8 are replaced
    #[cfg(not(unix))]
    pub fn to_os_str(&self) -> Cow<'_, OsStr> {
        match self.to_string_lossy() {
            Cow::Borrowed(s) => Cow::Borrowed(OsStr::new(s)),
            Cow::Owned(s) => Cow::Owned(s.into()),
        }
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.to_string_lossy())
    }
}

impl fmt::Debug for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}

/// One file stored in an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: EntryName,
    /// Absolute byte offset into the working source
    pub offset: u32,
    pub size: u32,
}

impl ArchiveEntry {
    /// First byte past the entry's data
    pub fn end(&self) -> u64 {
        u64::from(self.offset) + u64::from(self.size)
    }
}

/// Archive entries in on-disk order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryTable {
    entries: Vec<ArchiveEntry>,
}

impl EntryTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, entry: ArchiveEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ArchiveEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ArchiveEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a EntryTable {
    type Item = &'a ArchiveEntry;
    type IntoIter = std::slice::Iter<'a, ArchiveEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_looked_up_by_letter() {
        assert_eq!(Command::from_arg("l"), Some(Command::List));
        assert_eq!(Command::from_arg("x"), Some(Command::Extract));
        assert_eq!(Command::from_arg("list"), None);
        assert_eq!(Command::from_arg("X"), None);
    }

    #[test]
    fn name_stops_at_first_nul() {
        let name = EntryName::from_field(b"ROOM01.BMP\0\xff");
        assert_eq!(name.as_bytes(), b"ROOM01.BMP");
    }

    #[test]
    fn full_width_name_is_kept_without_terminator() {
        let name = EntryName::from_field(b"CHARACTER.PA");
        assert_eq!(name.len(), 12);
        assert_eq!(name.to_string_lossy(), "CHARACTER.PA");
    }

    #[test]
    fn suffix_is_appended_to_short_field() {
        let name = EntryName::from_field(b"INTRO\0\0\0").with_suffix(TND_NAME_SUFFIX);
        assert_eq!(name.as_bytes(), b"INTRO.TXT");

        let full = EntryName::from_field(b"CONVERSA").with_suffix(TND_NAME_SUFFIX);
        assert_eq!(full.as_bytes(), b"CONVERSA.TXT");
    }

    #[cfg(unix)]
    #[test]
    fn file_name_keeps_raw_bytes() {
        use std::os::unix::ffi::OsStrExt;

        let name = EntryName::from_field(b"CAF\xc9.PAL\0");
        assert_eq!(name.to_os_str().as_bytes(), b"CAF\xc9.PAL");
        assert_eq!(name.to_string(), "CAF\u{fffd}.PAL");
    }

    #[test]
    fn display_honours_padding() {
        let name = EntryName::from_field(b"A.TXT");
        assert_eq!(format!("{:>12}|", name), "       A.TXT|");
    }

    #[test]
    fn entry_end_does_not_overflow() {
        let entry = ArchiveEntry {
            name: EntryName::default(),
            offset: u32::MAX,
            size: u32::MAX,
        };
        assert_eq!(entry.end(), 2 * u64::from(u32::MAX));
    }
}
