//! Destination tree and output sinks
//!
//! The destination mirrors the disc: a root directory holding `VIDEO_TS/`
//! and the bad-sector ledger. Every non-duplicate stream gets one logical
//! output. Title VOB streams are split back into `VTS_xx_n.VOB` parts.

use crate::error::{Error, Result};
use crate::layout::{
    Domain, FileId, FileTable, MAX_VOB_PARTS, MAX_VOB_PART_BLOCKS, SECTOR_SIZE, VIDEO_TS_DIR,
};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Write side of a single logical output
///
/// Positions are absolute byte offsets within the logical stream.
pub trait OutputSink {
    /// Bytes currently held by the output
    fn current_size(&self) -> Result<u64>;

    /// Move the write cursor to the start of `block`
    fn seek_block(&mut self, block: u64) -> Result<()>;

    /// Write data at the cursor and advance it
    fn write_sectors(&mut self, data: &[u8]) -> Result<()>;

    /// Advance the cursor by `len` bytes without writing
    ///
    /// The output grows to cover the gap if needed. Existing data in the
    /// range is left as is.
    fn skip_sectors(&mut self, len: u64) -> Result<()>;

    /// Flush and close
    fn finish(&mut self) -> Result<()>;
}

/// One file backing part of a logical output
#[derive(Debug, Clone)]
struct Part {
    path: PathBuf,
    capacity: u64,
}

/// Filesystem-backed output spanning one or more part files
#[derive(Debug)]
pub struct FileSink {
    parts: Vec<Part>,
    cursor: u64,
    open: Option<(usize, File)>,
}

impl FileSink {
    /// Output stored in a single file
    pub fn single(path: impl Into<PathBuf>) -> Self {
        Self {
            parts: vec![Part {
                path: path.into(),
                capacity: u64::MAX,
            }],
            cursor: 0,
            open: None,
        }
    }

    /// Output split over `paths`, each holding at most its capacity in bytes
    ///
    /// The last part is unbounded.
    pub fn split(paths: Vec<PathBuf>, capacities: &[u64]) -> Self {
        let count = paths.len();
        let parts = paths
            .into_iter()
            .enumerate()
            .map(|(i, path)| Part {
                path,
                capacity: if i + 1 == count {
                    u64::MAX
                } else {
                    capacities.get(i).copied().unwrap_or(u64::MAX)
                },
            })
            .collect();
        Self {
            parts,
            cursor: 0,
            open: None,
        }
    }

    /// Current cursor position in bytes
    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// Paths of the part files, in stream order
    pub fn part_paths(&self) -> impl Iterator<Item = &Path> {
        self.parts.iter().map(|p| p.path.as_path())
    }

    /// Map a stream offset to (part index, offset within part)
    fn locate(&self, offset: u64) -> (usize, u64) {
        let mut base = 0u64;
        for (i, part) in self.parts.iter().enumerate() {
            if offset < base.saturating_add(part.capacity) {
                return (i, offset - base);
            }
            base = base.saturating_add(part.capacity);
        }
        let last = self.parts.len().saturating_sub(1);
        (last, offset - base)
    }

    fn part_file(&mut self, index: usize) -> Result<&mut File> {
        let reopen = !matches!(self.open, Some((i, _)) if i == index);
        if reopen {
            if let Some((_, mut old)) = self.open.take() {
                old.flush()?;
            }
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&self.parts[index].path)?;
            self.open = Some((index, file));
        }
        match self.open.as_mut() {
            Some((_, file)) => Ok(file),
            None => Err(Error::Io(std::io::Error::other("output part not open"))),
        }
    }
}

impl OutputSink for FileSink {
    fn current_size(&self) -> Result<u64> {
        let mut total = 0u64;
        for part in &self.parts {
            if part.capacity == 0 {
                continue;
            }
            let len = match std::fs::metadata(&part.path) {
                Ok(meta) => meta.len(),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => break,
                Err(e) => return Err(e.into()),
            };
            total += len.min(part.capacity);
            if len < part.capacity {
                break;
            }
        }
        Ok(total)
    }

    fn seek_block(&mut self, block: u64) -> Result<()> {
        self.cursor = block * SECTOR_SIZE;
        Ok(())
    }

    fn write_sectors(&mut self, data: &[u8]) -> Result<()> {
        let mut written = 0usize;
        while written < data.len() {
            let (index, offset) = self.locate(self.cursor);
            let room = self.parts[index].capacity - offset;
            let n = (data.len() - written).min(usize::try_from(room).unwrap_or(usize::MAX));

            let file = self.part_file(index)?;
            file.seek(SeekFrom::Start(offset))?;
            file.write_all(&data[written..written + n])?;

            written += n;
            self.cursor += n as u64;
        }
        Ok(())
    }

    fn skip_sectors(&mut self, len: u64) -> Result<()> {
        let end = self.cursor + len;
        while self.cursor < end {
            let (index, offset) = self.locate(self.cursor);
            let room = self.parts[index].capacity - offset;
            let n = (end - self.cursor).min(room);

            let file = self.part_file(index)?;
            if file.metadata()?.len() < offset + n {
                file.set_len(offset + n)?;
            }
            self.cursor += n;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        match self.open.take() {
            Some((_, mut file)) => file.flush()?,
            // Nothing written: an empty source still gets an output
            None => {
                if let Some(first) = self.parts.first() {
                    if !first.path.exists() {
                        File::create(&first.path)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        if let Some((_, mut file)) = self.open.take() {
            let _ = file.flush();
        }
    }
}

/// The destination directory tree
#[derive(Debug, Clone)]
pub struct OutputTree {
    root: PathBuf,
}

impl OutputTree {
    /// Create the root and its `VIDEO_TS` directory if missing
    pub fn prepare(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let video_ts = root.join(VIDEO_TS_DIR);
        if !video_ts.is_dir() {
            tracing::debug!("Creating {:?}", video_ts);
            std::fs::create_dir_all(&video_ts)?;
        }
        Ok(Self { root })
    }

    /// Destination root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `VIDEO_TS` directory under the root
    pub fn video_ts(&self) -> PathBuf {
        self.root.join(VIDEO_TS_DIR)
    }

    /// Destination path of a logical file
    pub fn file_path(&self, id: &FileId) -> PathBuf {
        self.video_ts().join(id.file_name())
    }

    /// Open the logical output for the stream starting at `id`
    ///
    /// Title VOB streams use the part sizes listed in `files` and fall back
    /// to 1 GiB parts when none are known.
    pub fn open_sink(&self, id: &FileId, files: &FileTable) -> FileSink {
        if id.domain != Domain::TitleVobs {
            return FileSink::single(self.file_path(id));
        }

        let mut capacities: Vec<u64> = files
            .part_blocks(id)
            .into_iter()
            .map(|blocks| blocks * SECTOR_SIZE)
            .collect();
        if capacities.len() <= 1 {
            capacities = vec![MAX_VOB_PART_BLOCKS * SECTOR_SIZE; MAX_VOB_PARTS as usize];
        }

        let paths = (1..=capacities.len() as u32)
            .map(|n| self.file_path(&FileId::new(id.title, id.domain, n)))
            .collect();
        FileSink::split(paths, &capacities)
    }
}
