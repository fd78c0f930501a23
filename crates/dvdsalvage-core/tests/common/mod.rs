//! In-memory disc with injectable read failures

#![allow(dead_code)]

use dvdsalvage_core::{
    DiscReader, DiscStream, Domain, FileId, Inventory, LogicalFile, Result, SECTOR_SIZE,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::rc::Rc;

/// One read request seen by the disc
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadCall {
    pub id: FileId,
    pub offset: u64,
    pub len: usize,
}

#[derive(Debug, Default)]
struct DiscState {
    files: BTreeMap<FileId, LogicalFile>,
    data: BTreeMap<FileId, Vec<u8>>,
    bad_blocks: BTreeMap<FileId, HashSet<u64>>,
    opens: Vec<FileId>,
    reads: Vec<ReadCall>,
}

/// Shared handle to an in-memory disc
///
/// Clones share state, so a test can keep one handle while the copier owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct MemoryDisc(Rc<RefCell<DiscState>>);

/// Deterministic content: every byte of block `b` is `seed + b`
pub fn pattern(seed: u8, blocks: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity((blocks * SECTOR_SIZE) as usize);
    for b in 0..blocks {
        data.extend(std::iter::repeat_n(seed.wrapping_add(b as u8), SECTOR_SIZE as usize));
    }
    data
}

impl MemoryDisc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a readable file
    pub fn add_file(&self, id: FileId, data: Vec<u8>) -> &Self {
        let mut state = self.0.borrow_mut();
        state
            .files
            .insert(id, LogicalFile::new(id, data.len() as u64));
        state.data.insert(id, data);
        self
    }

    /// Add a file listed by the inventory that the reader cannot open
    pub fn add_absent(&self, id: FileId, size: u64) -> &Self {
        self.0
            .borrow_mut()
            .files
            .insert(id, LogicalFile::new(id, size));
        self
    }

    /// Add a duplicate of `original`
    pub fn add_duplicate(&self, id: FileId, original: FileId) -> &Self {
        let mut state = self.0.borrow_mut();
        let data = state.data.get(&original).cloned().unwrap_or_default();
        state.files.insert(
            id,
            LogicalFile::new(id, data.len() as u64).duplicate_of(original),
        );
        state.data.insert(id, data);
        self
    }

    /// Make `block` of the stream starting at `id` unreadable
    pub fn fail_block(&self, id: FileId, block: u64) -> &Self {
        self.0
            .borrow_mut()
            .bad_blocks
            .entry(id)
            .or_default()
            .insert(block);
        self
    }

    /// Make every block readable again
    pub fn clear_failures(&self) -> &Self {
        self.0.borrow_mut().bad_blocks.clear();
        self
    }

    /// Forget recorded opens and reads
    pub fn reset_log(&self) {
        let mut state = self.0.borrow_mut();
        state.opens.clear();
        state.reads.clear();
    }

    pub fn reads(&self) -> Vec<ReadCall> {
        self.0.borrow().reads.clone()
    }

    pub fn reads_for(&self, id: FileId) -> Vec<ReadCall> {
        self.reads().into_iter().filter(|r| r.id == id).collect()
    }

    pub fn opens(&self) -> Vec<FileId> {
        self.0.borrow().opens.clone()
    }

    /// Concatenated content of the stream starting at `id`
    pub fn stream_data(&self, id: FileId) -> Vec<u8> {
        let state = self.0.borrow();
        if id.domain == Domain::TitleVobs {
            state
                .data
                .range(id..)
                .take_while(|(k, _)| k.title == id.title && k.domain == id.domain)
                .flat_map(|(_, v)| v.iter().copied())
                .collect()
        } else {
            state.data.get(&id).cloned().unwrap_or_default()
        }
    }
}

impl Inventory for MemoryDisc {
    fn list_files(&self) -> Result<Vec<LogicalFile>> {
        Ok(self.0.borrow().files.values().cloned().collect())
    }
}

impl DiscReader for MemoryDisc {
    type Stream = MemoryStream;

    fn open_file(&mut self, id: &FileId) -> Result<Option<MemoryStream>> {
        self.0.borrow_mut().opens.push(*id);
        if !self.0.borrow().data.contains_key(id) {
            return Ok(None);
        }
        Ok(Some(MemoryStream {
            disc: self.clone(),
            id: *id,
            data: self.stream_data(*id),
            position: 0,
        }))
    }
}

/// Open stream on a [`MemoryDisc`]
pub struct MemoryStream {
    disc: MemoryDisc,
    id: FileId,
    data: Vec<u8>,
    position: u64,
}

impl MemoryStream {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.disc.0.borrow_mut().reads.push(ReadCall {
            id: self.id,
            offset,
            len: buf.len(),
        });

        let start = (offset as usize).min(self.data.len());
        let n = buf.len().min(self.data.len() - start);
        let first = offset / SECTOR_SIZE;
        let last = (offset + n as u64).div_ceil(SECTOR_SIZE);

        let state = self.disc.0.borrow();
        if let Some(bad) = state.bad_blocks.get(&self.id) {
            if (first..last).any(|b| bad.contains(&b)) {
                return Err(io::Error::other("input/output error"));
            }
        }

        buf[..n].copy_from_slice(&self.data[start..start + n]);
        Ok(n)
    }
}

impl DiscStream for MemoryStream {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn seek_bytes(&mut self, offset: u64) -> io::Result<()> {
        self.position = offset;
        Ok(())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.read_at(self.position, buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn read_blocks(&mut self, block: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.read_at(block * SECTOR_SIZE, buf)
    }
}
