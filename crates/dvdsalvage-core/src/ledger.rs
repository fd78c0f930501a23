//! Bad-sector ledger
//!
//! One text line per unreadable range, appended and flushed the moment the
//! failure happens:
//!
//! ```text
//! VTS_01_1.VOB: 1,3,1  200 (8)
//! ```
//!
//! The file name before the colon is informational. The five integers are
//! title, domain code, sequence number, start block and block count.

use crate::error::{Error, Result};
use crate::layout::{Domain, FileId};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static LEDGER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^:]+: *([0-9]+),([0-9]+),([0-9]+) +([0-9]+) *\(([0-9]+)\)\s*$").unwrap()
});

/// A contiguous range of sectors that could not be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BadSectorRecord {
    /// File the range belongs to
    pub id: FileId,
    /// First unreadable block, absolute within the file's stream
    pub start_block: u64,
    /// Number of blocks in the range (never 0)
    pub block_count: u64,
}

impl BadSectorRecord {
    /// Create a record
    pub fn new(id: FileId, start_block: u64, block_count: u64) -> Self {
        Self {
            id,
            start_block,
            block_count,
        }
    }

    /// First block after the range
    pub fn end_block(&self) -> u64 {
        self.start_block + self.block_count
    }

    /// Ledger line for this record, without the trailing newline
    pub fn to_line(&self) -> String {
        format!(
            "{}: {}  {} ({})",
            self.id.file_name(),
            self.id,
            self.start_block,
            self.block_count
        )
    }

    /// Parse one ledger line
    ///
    /// Returns `None` when the line does not carry five valid integers.
    pub fn parse_line(line: &str) -> Option<Self> {
        let caps = LEDGER_LINE.captures(line)?;
        let title: u32 = caps[1].parse().ok()?;
        let domain = Domain::from_code(caps[2].parse().ok()?)?;
        let number: u32 = caps[3].parse().ok()?;
        let start_block: u64 = caps[4].parse().ok()?;
        let block_count: u64 = caps[5].parse().ok()?;

        if number == 0 || block_count == 0 {
            return None;
        }

        Some(Self::new(
            FileId::new(title, domain, number),
            start_block,
            block_count,
        ))
    }
}

/// A ledger line that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedLine {
    /// 1-based line number
    pub line_number: usize,
    /// Raw line text
    pub text: String,
}

/// Result of loading a ledger file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerContents {
    /// Whether the ledger file existed
    pub found: bool,
    /// Parsed records in file order
    pub records: Vec<BadSectorRecord>,
    /// Lines that were skipped
    pub malformed: Vec<MalformedLine>,
}

/// Append-only writer for the bad-sector ledger
///
/// The file is created on the first append, so a clean run leaves no ledger
/// behind.
#[derive(Debug)]
pub struct BadSectorLedger {
    path: PathBuf,
    file: Option<File>,
}

impl BadSectorLedger {
    /// Create a ledger writer for `path` without touching the filesystem
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    /// Ledger path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record and flush it to disk
    pub fn append(&mut self, record: &BadSectorRecord) -> Result<()> {
        let path = self.path.clone();
        let ledger_err = |source| Error::Ledger {
            path: path.clone(),
            source,
        };

        if self.file.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(ledger_err)?;
            self.file = Some(file);
        }

        if let Some(file) = self.file.as_mut() {
            writeln!(file, "{}", record.to_line()).map_err(ledger_err)?;
            file.flush().map_err(ledger_err)?;
            file.sync_data().map_err(ledger_err)?;
        }

        tracing::debug!("Ledger: {}", record.to_line());
        Ok(())
    }

    /// Load every record from a ledger file
    ///
    /// A missing file yields empty contents. Malformed lines are logged and
    /// collected rather than failing the load.
    pub fn load(path: &Path) -> Result<LedgerContents> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No ledger at {:?}", path);
                return Ok(LedgerContents::default());
            }
            Err(source) => {
                return Err(Error::Ledger {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut contents = LedgerContents {
            found: true,
            ..LedgerContents::default()
        };

        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|source| Error::Ledger {
                path: path.to_path_buf(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }

            match BadSectorRecord::parse_line(&line) {
                Some(record) => contents.records.push(record),
                None => {
                    tracing::warn!("Error parsing ledger line {}: {:?}", index + 1, line);
                    contents.malformed.push(MalformedLine {
                        line_number: index + 1,
                        text: line,
                    });
                }
            }
        }

        Ok(contents)
    }
}
