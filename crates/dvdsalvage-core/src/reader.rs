//! Device reader
//!
//! A [`DiscReader`] opens logical files; a [`DiscStream`] reads one of them.
//! Byte-stream domains are read with a byte seek followed by byte reads,
//! block-stream domains by absolute block index. Title VOB parts are exposed
//! as one concatenated stream.

use crate::error::{Error, Result};
use crate::inventory::{find_video_ts, scan_video_ts};
use crate::layout::{Domain, FileId, MAX_VOB_PARTS, SECTOR_SIZE};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// An open logical file
///
/// Read failures are reported as `io::Error` values. The copier treats them
/// as unreadable sectors, not as fatal errors.
pub trait DiscStream {
    /// Size of the logical file in bytes
    fn size(&self) -> u64;

    /// Position the byte cursor
    fn seek_bytes(&mut self, offset: u64) -> io::Result<()>;

    /// Read bytes at the cursor, returning how many were read
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Read whole sectors starting at `block`, returning the bytes read
    fn read_blocks(&mut self, block: u64, buf: &mut [u8]) -> io::Result<usize>;
}

/// Opens logical files on a disc
pub trait DiscReader {
    /// Stream type for an open file
    type Stream: DiscStream;

    /// Open a logical file; `None` when the disc has no such file
    fn open_file(&mut self, id: &FileId) -> Result<Option<Self::Stream>>;
}

/// Reader over a mounted disc or an extracted `VIDEO_TS` tree
#[derive(Debug)]
pub struct VideoTsReader {
    video_ts: PathBuf,
    files: HashMap<FileId, PathBuf>,
}

impl VideoTsReader {
    /// Open the disc at `source`
    pub fn open(source: &Path) -> Result<Self> {
        if !source.exists() {
            return Err(Error::SourceNotFound(source.display().to_string()));
        }

        let video_ts = find_video_ts(source).ok_or_else(|| Error::DeviceOpen {
            path: source.to_path_buf(),
            reason: "no VIDEO_TS directory".to_string(),
        })?;
        let files = scan_video_ts(&video_ts).map_err(|e| Error::DeviceOpen {
            path: video_ts.clone(),
            reason: e.to_string(),
        })?;

        tracing::debug!("Opened {:?} ({} files)", video_ts, files.len());
        Ok(Self { video_ts, files })
    }

    /// The `VIDEO_TS` directory being read
    pub fn video_ts(&self) -> &Path {
        &self.video_ts
    }

    fn open_part(path: &Path) -> io::Result<(File, u64)> {
        let file = dvdsalvage_platform::open_sequential(path).map_err(|e| match e {
            dvdsalvage_platform::PlatformError::Io(io) => io,
            other => io::Error::other(other.to_string()),
        })?;
        let len = file.metadata()?.len();
        Ok((file, len))
    }
}

impl DiscReader for VideoTsReader {
    type Stream = VideoTsStream;

    fn open_file(&mut self, id: &FileId) -> Result<Option<VideoTsStream>> {
        let paths: Vec<&PathBuf> = match id.domain {
            Domain::TitleVobs => (id.number..=MAX_VOB_PARTS)
                .map(|n| self.files.get(&FileId::new(id.title, id.domain, n)))
                .take_while(Option::is_some)
                .flatten()
                .collect(),
            _ => self.files.get(id).into_iter().collect(),
        };
        if paths.is_empty() {
            return Ok(None);
        }

        let mut parts = Vec::with_capacity(paths.len());
        for path in paths {
            match Self::open_part(path) {
                Ok(part) => parts.push(part),
                Err(e) if parts.is_empty() => {
                    tracing::warn!("Cannot open {:?}: {}", path, e);
                    return Ok(None);
                }
                Err(e) => {
                    tracing::warn!("Cannot open {:?}, stream ends before it: {}", path, e);
                    break;
                }
            }
        }

        Ok(Some(VideoTsStream::new(parts)))
    }
}

/// A logical file backed by one or more files
#[derive(Debug)]
pub struct VideoTsStream {
    parts: Vec<(File, u64)>,
    size: u64,
    position: u64,
}

impl VideoTsStream {
    fn new(parts: Vec<(File, u64)>) -> Self {
        let size = parts.iter().map(|(_, len)| len).sum();
        Self {
            parts,
            size,
            position: 0,
        }
    }

    /// Read into `buf` from the current position, crossing part boundaries
    fn read_here(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() && self.position < self.size {
            let mut base = 0u64;
            let mut target = None;
            for (i, (_, len)) in self.parts.iter().enumerate() {
                if self.position < base + len {
                    target = Some((i, self.position - base, len - (self.position - base)));
                    break;
                }
                base += len;
            }
            let Some((index, offset, left)) = target else {
                break;
            };

            let want = (buf.len() - filled).min(usize::try_from(left).unwrap_or(usize::MAX));
            let file = &mut self.parts[index].0;
            file.seek(SeekFrom::Start(offset))?;
            let n = file.read(&mut buf[filled..filled + want])?;
            if n == 0 {
                break;
            }
            filled += n;
            self.position += n as u64;
        }
        Ok(filled)
    }
}

impl DiscStream for VideoTsStream {
    fn size(&self) -> u64 {
        self.size
    }

    fn seek_bytes(&mut self, offset: u64) -> io::Result<()> {
        if offset > self.size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("seek to {} beyond end ({})", offset, self.size),
            ));
        }
        self.position = offset;
        Ok(())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_here(buf)
    }

    fn read_blocks(&mut self, block: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.seek_bytes(block * SECTOR_SIZE)?;
        self.read_here(buf)
    }
}
