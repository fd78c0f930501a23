//! Logical file model of a video DVD
//!
//! A disc exposes its content as logical files identified by a title set
//! number, a domain and a sequence number. This module maps identities to the
//! `VIDEO_TS` file names and keeps the ordered file table that the copier
//! walks.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Size of one DVD sector in bytes
pub const SECTOR_SIZE: u64 = 2048;

/// Highest title set number a disc may carry
pub const MAX_TITLE: u32 = 99;

/// Highest sequence number of a title VOB part
pub const MAX_VOB_PARTS: u32 = 9;

/// Default size cap of a single output VOB part (1 GiB)
pub const MAX_VOB_PART_BLOCKS: u64 = 1024 * 1024 * 1024 / SECTOR_SIZE;

/// Name of the directory holding the disc's files
pub const VIDEO_TS_DIR: &str = "VIDEO_TS";

/// Category of a logical file
///
/// The numeric codes are part of the bad-sector ledger format and must not
/// change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Domain {
    /// Navigation information (`.IFO`)
    Info,
    /// Backup copy of the navigation information (`.BUP`)
    InfoBackup,
    /// Menu video objects (`VIDEO_TS.VOB`, `VTS_xx_0.VOB`)
    MenuVobs,
    /// Title video objects (`VTS_xx_1.VOB` .. `VTS_xx_9.VOB`)
    TitleVobs,
}

/// Granularity at which a domain's stream is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Read as bytes after a byte seek
    Bytes,
    /// Read as whole sectors addressed by block index
    Blocks,
}

impl Domain {
    /// All domains in inventory order
    pub const ALL: [Self; 4] = [Self::Info, Self::InfoBackup, Self::MenuVobs, Self::TitleVobs];

    /// Numeric code used in the ledger
    pub fn code(self) -> u32 {
        match self {
            Self::Info => 0,
            Self::InfoBackup => 1,
            Self::MenuVobs => 2,
            Self::TitleVobs => 3,
        }
    }

    /// Parse a ledger domain code
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Info),
            1 => Some(Self::InfoBackup),
            2 => Some(Self::MenuVobs),
            3 => Some(Self::TitleVobs),
            _ => None,
        }
    }

    /// Stream granularity for this domain
    pub fn stream_kind(self) -> StreamKind {
        match self {
            Self::Info | Self::InfoBackup => StreamKind::Bytes,
            Self::MenuVobs | Self::TitleVobs => StreamKind::Blocks,
        }
    }

    /// Human-readable name
    pub fn name(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::InfoBackup => "info-backup",
            Self::MenuVobs => "menu-vobs",
            Self::TitleVobs => "title-vobs",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Info => "IFO",
            Self::InfoBackup => "BUP",
            Self::MenuVobs | Self::TitleVobs => "VOB",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of a logical file on the disc
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId {
    /// Title set number (0 = video manager)
    pub title: u32,
    /// Domain of the file
    pub domain: Domain,
    /// Sequence number, starting at 1
    pub number: u32,
}

impl FileId {
    /// Create a new identity
    pub fn new(title: u32, domain: Domain, number: u32) -> Self {
        Self {
            title,
            domain,
            number,
        }
    }

    /// Whether this file continues the stream started by sequence number 1
    pub fn is_continuation(&self) -> bool {
        self.number > 1
    }

    /// Identity of the first file of this stream
    pub fn first_of_stream(&self) -> Self {
        Self::new(self.title, self.domain, 1)
    }

    /// File name inside `VIDEO_TS`
    pub fn file_name(&self) -> String {
        let ext = self.domain.extension();
        match (self.title, self.domain) {
            (0, Domain::TitleVobs) => format!("VTS_00_{}.{}", self.number, ext),
            (0, _) => format!("VIDEO_TS.{}", ext),
            (t, Domain::TitleVobs) => format!("VTS_{:02}_{}.{}", t, self.number, ext),
            (t, _) => format!("VTS_{:02}_0.{}", t, ext),
        }
    }

    /// Parse a `VIDEO_TS` file name (case-insensitive)
    ///
    /// Returns `None` for names that are not part of the DVD-Video layout.
    pub fn parse_file_name(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        let (stem, ext) = upper.rsplit_once('.')?;

        if stem == "VIDEO_TS" {
            let domain = match ext {
                "IFO" => Domain::Info,
                "BUP" => Domain::InfoBackup,
                "VOB" => Domain::MenuVobs,
                _ => return None,
            };
            return Some(Self::new(0, domain, 1));
        }

        let rest = stem.strip_prefix("VTS_")?;
        let (title_str, part_str) = rest.split_once('_')?;
        if title_str.len() != 2 || part_str.len() != 1 {
            return None;
        }
        let title: u32 = title_str.parse().ok()?;
        let part: u32 = part_str.parse().ok()?;
        if title == 0 || title > MAX_TITLE {
            return None;
        }

        match (part, ext) {
            (0, "IFO") => Some(Self::new(title, Domain::Info, 1)),
            (0, "BUP") => Some(Self::new(title, Domain::InfoBackup, 1)),
            (0, "VOB") => Some(Self::new(title, Domain::MenuVobs, 1)),
            (1..=MAX_VOB_PARTS, "VOB") => Some(Self::new(title, Domain::TitleVobs, part)),
            _ => None,
        }
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.title, self.domain.code(), self.number)
    }
}

/// A logical file as listed by the inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalFile {
    /// Identity on the disc
    pub id: FileId,

    /// Size in bytes as reported by the inventory (may be 0 for unreadable entries)
    pub size: u64,

    /// Earlier file with identical content, if any
    pub duplicate_of: Option<FileId>,
}

impl LogicalFile {
    /// Create a file without a duplicate relation
    pub fn new(id: FileId, size: u64) -> Self {
        Self {
            id,
            size,
            duplicate_of: None,
        }
    }

    /// Mark this file as a byte-identical duplicate of `original`
    pub fn duplicate_of(mut self, original: FileId) -> Self {
        self.duplicate_of = Some(original);
        self
    }

    /// File name inside `VIDEO_TS`
    pub fn file_name(&self) -> String {
        self.id.file_name()
    }

    /// Size in whole sectors, rounding a partial trailing sector up
    pub fn size_blocks(&self) -> u64 {
        self.size.div_ceil(SECTOR_SIZE)
    }
}

/// Ordered table of a disc's logical files
///
/// Owns every `LogicalFile` for the duration of a run; everything else refers
/// to files by `FileId`.
#[derive(Debug, Clone, Default)]
pub struct FileTable {
    files: Vec<LogicalFile>,
    index: HashMap<FileId, usize>,
}

impl FileTable {
    /// Build a table, ordering files by (title, domain, sequence)
    pub fn new(mut files: Vec<LogicalFile>) -> Self {
        files.sort_by_key(|f| f.id);
        files.dedup_by_key(|f| f.id);
        let index = files.iter().enumerate().map(|(i, f)| (f.id, i)).collect();
        Self { files, index }
    }

    /// Look up a file by identity
    pub fn get(&self, id: &FileId) -> Option<&LogicalFile> {
        self.index.get(id).map(|&i| &self.files[i])
    }

    /// Iterate in inventory order
    pub fn iter(&self) -> std::slice::Iter<'_, LogicalFile> {
        self.files.iter()
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Sizes in blocks of every sequence part of the stream `id` belongs to
    pub fn part_blocks(&self, id: &FileId) -> Vec<u64> {
        self.files
            .iter()
            .filter(|f| f.id.title == id.title && f.id.domain == id.domain)
            .map(LogicalFile::size_blocks)
            .collect()
    }

    /// Total byte size of the stream `id` belongs to
    pub fn stream_size(&self, id: &FileId) -> u64 {
        self.files
            .iter()
            .filter(|f| f.id.title == id.title && f.id.domain == id.domain)
            .map(|f| f.size)
            .sum()
    }
}

impl<'a> IntoIterator for &'a FileTable {
    type Item = &'a LogicalFile;
    type IntoIter = std::slice::Iter<'a, LogicalFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}
