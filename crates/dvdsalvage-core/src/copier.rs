//! Copy orchestration
//!
//! [`DiscCopier`] walks the inventory once, copying every logical file in
//! fixed-size chunks. A chunk that cannot be read is skipped in the output,
//! recorded in the bad-sector ledger and counted; the copy carries on. The
//! repair pass reads the ledger back and retries only the recorded ranges.

use crate::config::CopyConfig;
use crate::error::{Error, Result};
use crate::inventory::{Inventory, VideoTsInventory};
use crate::layout::{FileId, FileTable, StreamKind, SECTOR_SIZE};
use crate::ledger::{BadSectorLedger, BadSectorRecord, MalformedLine};
use crate::output::{OutputSink, OutputTree};
use crate::progress::{CopyEvent, CopyProgress, SkipReason};
use crate::reader::{DiscReader, DiscStream, VideoTsReader};
use dvdsalvage_platform::{align_down, align_up, is_aligned};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

/// Event callback type
pub type EventCallback = Box<dyn Fn(&CopyEvent) + Send + Sync>;

/// What happened to one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Data was read; `skipped_blocks` could not be
    Copied {
        /// Blocks that could not be read
        skipped_blocks: u64,
    },
    /// Hard linked to its original
    Linked {
        /// The link was already in place
        already_linked: bool,
    },
    /// Nothing to read
    Skipped(SkipReason),
}

impl FileOutcome {
    /// Blocks left unread by this file
    pub fn skipped_blocks(&self) -> u64 {
        match self {
            Self::Copied { skipped_blocks } => *skipped_blocks,
            _ => 0,
        }
    }
}

/// Result of a full copy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CopySummary {
    /// Files that were read
    pub files_copied: usize,
    /// Duplicates linked to their original
    pub files_linked: usize,
    /// Continuations and already complete files
    pub files_skipped: usize,
    /// Files listed by the inventory but missing on the disc
    pub files_absent: usize,
    /// Sectors that could not be read
    pub missing_sectors: u64,
    /// Ranges recorded in the ledger during this run
    pub bad_sectors: Vec<BadSectorRecord>,
}

/// Retry result for one ledger record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairOutcome {
    /// Record that was retried
    pub record: BadSectorRecord,
    /// Sectors of the range that are still unreadable
    pub still_missing: u64,
}

/// Result of a repair pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairSummary {
    /// Whether a ledger was found at all
    pub ledger_found: bool,
    /// One entry per retried range, in file order
    ///
    /// Overlapping and repeated records of a file are merged into one range.
    pub outcomes: Vec<RepairOutcome>,
    /// Records naming files the disc does not have, or starting past their end
    pub unresolved: Vec<BadSectorRecord>,
    /// Ledger lines that could not be parsed
    pub malformed: Vec<MalformedLine>,
    /// Distinct sectors still missing across all ranges
    pub total_missing: u64,
}

/// Copies a disc's logical files into a destination tree
pub struct DiscCopier<R: DiscReader> {
    reader: R,
    files: FileTable,
    output: OutputTree,
    ledger: BadSectorLedger,
    config: CopyConfig,
    event_callback: Option<EventCallback>,
    records: Vec<BadSectorRecord>,
    /// Records already in the ledger file; these are not appended again
    known_records: HashSet<BadSectorRecord>,
}

impl DiscCopier<VideoTsReader> {
    /// Prepare a copy from the disc at `source` into `destination`
    ///
    /// Creates the destination tree, lists the disc and opens it.
    pub fn open(source: &Path, destination: &Path, config: CopyConfig) -> Result<Self> {
        if !source.exists() {
            return Err(Error::SourceNotFound(source.display().to_string()));
        }
        let output = OutputTree::prepare(destination)?;
        let inventory = VideoTsInventory::new(source);
        let reader = VideoTsReader::open(source)?;
        Self::new(&inventory, reader, output, config)
    }
}

impl<R: DiscReader> DiscCopier<R> {
    /// Create a copier, listing the inventory once
    pub fn new<I: Inventory + ?Sized>(
        inventory: &I,
        reader: R,
        output: OutputTree,
        config: CopyConfig,
    ) -> Result<Self> {
        config.validate()?;
        let files = FileTable::new(inventory.list_files()?);
        let ledger = BadSectorLedger::new(output.root().join(&config.ledger_file_name));

        tracing::debug!("{} files to copy into {:?}", files.len(), output.root());

        Ok(Self {
            reader,
            files,
            output,
            ledger,
            config,
            event_callback: None,
            records: Vec::new(),
            known_records: HashSet::new(),
        })
    }

    /// Set an event callback
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(&CopyEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(Box::new(callback));
        self
    }

    /// The disc's file table
    pub fn files(&self) -> &FileTable {
        &self.files
    }

    /// The reader in use
    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Path of the bad-sector ledger
    pub fn ledger_path(&self) -> &Path {
        self.ledger.path()
    }

    /// Ranges recorded since this copier was created
    pub fn bad_sectors(&self) -> &[BadSectorRecord] {
        &self.records
    }

    /// Copy one logical file
    ///
    /// `resume_from_block` is the number of blocks already in the output;
    /// `max_blocks` restricts the copy to a range (repair mode). Returns the
    /// number of sectors that could not be read.
    pub fn copy_one_file(
        &mut self,
        id: &FileId,
        resume_from_block: u64,
        max_blocks: Option<u64>,
    ) -> Result<u64> {
        let chunk = if max_blocks.is_some() {
            self.config.repair_chunk_blocks
        } else {
            self.config.chunk_blocks
        };
        self.process_file(id, resume_from_block, max_blocks, chunk)
            .map(|outcome| outcome.skipped_blocks())
    }

    /// Copy every file in inventory order
    pub fn copy_all(&mut self) -> Result<CopySummary> {
        let ids: Vec<FileId> = self.files.iter().map(|f| f.id).collect();
        let first_record = self.records.len();
        let mut summary = CopySummary::default();

        for id in ids {
            match self.process_file(&id, 0, None, self.config.chunk_blocks)? {
                FileOutcome::Copied { skipped_blocks } => {
                    summary.files_copied += 1;
                    summary.missing_sectors += skipped_blocks;
                }
                FileOutcome::Linked { .. } => summary.files_linked += 1,
                FileOutcome::Skipped(SkipReason::NotFound) => summary.files_absent += 1,
                FileOutcome::Skipped(_) => summary.files_skipped += 1,
            }
        }

        summary.bad_sectors = self.records[first_record..].to_vec();
        if summary.missing_sectors > 0 {
            tracing::warn!(
                "Altogether, {} sectors could not be read; run a repair pass to retry them",
                summary.missing_sectors
            );
        }
        Ok(summary)
    }

    /// Retry every range recorded in the ledger
    ///
    /// Records of the same file that overlap are merged first, so every
    /// sector is read at most once per pass. Sectors that still fail are
    /// appended at repair granularity unless the ledger already holds that
    /// exact record. Records added during the pass are not retried until the
    /// next one.
    pub fn second_pass(&mut self) -> Result<RepairSummary> {
        let contents = BadSectorLedger::load(self.ledger.path())?;
        let mut summary = RepairSummary {
            ledger_found: contents.found,
            malformed: contents.malformed,
            ..RepairSummary::default()
        };

        if !contents.found {
            tracing::info!("No bad sectors file found, which is probably good news!");
            return Ok(summary);
        }

        self.known_records.extend(contents.records.iter().copied());

        let mut worklist = Vec::with_capacity(contents.records.len());
        for record in contents.records {
            if self.files.get(&record.id).is_none() {
                tracing::warn!("Found no match for file {}", record.id);
                summary.unresolved.push(record);
                continue;
            }

            let total_blocks = self.files.stream_size(&record.id).div_ceil(SECTOR_SIZE);
            if record.start_block >= total_blocks {
                tracing::warn!(
                    "{}: recorded range at block {} lies past the end of the file ({} blocks)",
                    record.id.file_name(),
                    record.start_block,
                    total_blocks
                );
                summary.unresolved.push(record);
                continue;
            }
            worklist.push(record);
        }

        for record in merge_ranges(worklist) {
            tracing::info!(
                "Trying to read {} bad sectors from file {} at {}",
                record.block_count,
                record.id.file_name(),
                record.start_block
            );

            let still_missing = self
                .process_file(
                    &record.id,
                    record.start_block,
                    Some(record.block_count),
                    self.config.repair_chunk_blocks,
                )?
                .skipped_blocks();

            if still_missing == 0 {
                tracing::info!("-> apparently successfully read missing sectors");
            } else {
                tracing::warn!(
                    "-> still got {} bad sectors (out of {})",
                    still_missing,
                    record.block_count
                );
            }
            summary.total_missing += still_missing;
            summary.outcomes.push(RepairOutcome {
                record,
                still_missing,
            });
        }

        tracing::info!(
            "Altogether, there are still {} missing sectors",
            summary.total_missing
        );
        Ok(summary)
    }

    fn emit(&self, event: CopyEvent) {
        if let Some(ref callback) = self.event_callback {
            callback(&event);
        }
    }

    fn process_file(
        &mut self,
        id: &FileId,
        resume_from_block: u64,
        max_blocks: Option<u64>,
        chunk_blocks: u64,
    ) -> Result<FileOutcome> {
        let file = self
            .files
            .get(id)
            .cloned()
            .ok_or_else(|| Error::Inventory(format!("{} is not on this disc", id.file_name())))?;

        if let Some(original) = file.duplicate_of {
            let already_linked = self.link_duplicate(&file.id, &original)?;
            return Ok(FileOutcome::Linked { already_linked });
        }

        if file.id.is_continuation() {
            tracing::debug!(
                "{} is copied along with {}",
                file.file_name(),
                file.id.first_of_stream().file_name()
            );
            self.emit(CopyEvent::Skipped {
                id: file.id,
                reason: SkipReason::Continuation,
            });
            return Ok(FileOutcome::Skipped(SkipReason::Continuation));
        }

        let Some(mut stream) = self.reader.open_file(&file.id)? else {
            tracing::info!("Skipping file {} (not found)", file.file_name());
            self.emit(CopyEvent::Skipped {
                id: file.id,
                reason: SkipReason::NotFound,
            });
            return Ok(FileOutcome::Skipped(SkipReason::NotFound));
        };

        let mut sink = self.output.open_sink(&file.id, &self.files);
        let outcome = self.copy_stream(
            &file.id,
            &mut stream,
            &mut sink,
            resume_from_block,
            max_blocks,
            chunk_blocks,
        )?;
        sink.finish()?;
        Ok(outcome)
    }

    /// Link a duplicate to its original; returns whether the link already existed
    fn link_duplicate(&self, id: &FileId, original: &FileId) -> Result<bool> {
        let link = self.output.file_path(id);
        let target = self.output.file_path(original);

        if !target.exists() {
            return Err(Error::BrokenDuplicate {
                link,
                original: target,
            });
        }

        if link.exists() {
            if dvdsalvage_platform::is_same_file(&link, &target)? {
                tracing::info!(
                    "Not hardlinking {} to {}, already done",
                    id.file_name(),
                    original.file_name()
                );
                self.emit(CopyEvent::Linked {
                    id: *id,
                    original: *original,
                    already_linked: true,
                });
                return Ok(true);
            }
            return Err(Error::LinkConflict {
                link,
                original: target,
            });
        }

        tracing::info!(
            "Hardlinking {} to {}",
            id.file_name(),
            original.file_name()
        );
        dvdsalvage_platform::hard_link(&target, &link)?;
        self.emit(CopyEvent::Linked {
            id: *id,
            original: *original,
            already_linked: false,
        });
        Ok(false)
    }

    fn copy_stream<S: DiscStream, O: OutputSink>(
        &mut self,
        id: &FileId,
        stream: &mut S,
        sink: &mut O,
        resume_from_block: u64,
        max_blocks: Option<u64>,
        chunk_blocks: u64,
    ) -> Result<FileOutcome> {
        let source_size = stream.size();
        let output_size = sink.current_size()?;

        if max_blocks.is_none() && resume_from_block == 0 && output_size == source_size {
            tracing::info!(
                "{}: file already fully read, not reading again",
                id.file_name()
            );
            self.emit(CopyEvent::Skipped {
                id: *id,
                reason: SkipReason::AlreadyComplete,
            });
            return Ok(FileOutcome::Skipped(SkipReason::AlreadyComplete));
        }

        let plan = ReadPlan::new(
            source_size,
            output_size,
            resume_from_block,
            max_blocks,
            chunk_blocks,
        );
        if plan.start_block > 0 {
            tracing::debug!(
                "{}: resuming at block {}",
                id.file_name(),
                plan.start_block
            );
        }
        if max_blocks.is_none() && resume_from_block == 0 && !is_aligned(output_size, SECTOR_SIZE)
        {
            tracing::debug!(
                "{}: rewriting the partial sector at the end of the output",
                id.file_name()
            );
        }

        let kind = id.domain.stream_kind();
        let mut cursor = plan.start_block * SECTOR_SIZE;
        let mut stream_position: Option<u64> = None;
        let mut skipped_blocks = 0u64;
        let mut buf = vec![0u8; plan.chunk_bytes() as usize];
        let mut progress = CopyProgress::new(*id, plan.start_block, plan.end_block);

        sink.seek_block(plan.start_block)?;
        self.emit(CopyEvent::FileStarted {
            id: *id,
            start_block: plan.start_block,
            end_block: plan.end_block,
        });

        while cursor < plan.end {
            let want = (plan.end - cursor).min(plan.chunk_bytes());
            let request = match kind {
                StreamKind::Bytes => want,
                StreamKind::Blocks => align_up(want, SECTOR_SIZE),
            };
            let request = request as usize;

            let result = match kind {
                StreamKind::Bytes => {
                    let seeked = if stream_position == Some(cursor) {
                        Ok(())
                    } else {
                        stream.seek_bytes(cursor)
                    };
                    seeked.and_then(|()| stream.read_bytes(&mut buf[..request]))
                }
                StreamKind::Blocks => {
                    stream.read_blocks(cursor / SECTOR_SIZE, &mut buf[..request])
                }
            };

            match result {
                Ok(n) if n > 0 => {
                    let n = (n as u64).min(want);
                    if self.config.verbose {
                        tracing::debug!(
                            "{}: read {} bytes at block {}",
                            id.file_name(),
                            n,
                            cursor / SECTOR_SIZE
                        );
                    }
                    sink.write_sectors(&buf[..n as usize])?;
                    cursor += n;
                    stream_position = Some(cursor);
                }
                failed => {
                    let reason = match failed {
                        Err(e) => e.to_string(),
                        Ok(_) => "short read".to_string(),
                    };
                    let record = BadSectorRecord::new(
                        *id,
                        cursor / SECTOR_SIZE,
                        want.div_ceil(SECTOR_SIZE),
                    );
                    tracing::warn!(
                        "{}: skipping {} sectors at block {}: {}",
                        id.file_name(),
                        record.block_count,
                        record.start_block,
                        reason
                    );

                    sink.skip_sectors(want)?;
                    if self.known_records.insert(record) {
                        self.ledger.append(&record)?;
                        self.records.push(record);
                    } else {
                        tracing::debug!(
                            "{}: {} sectors at block {} already recorded",
                            id.file_name(),
                            record.block_count,
                            record.start_block
                        );
                    }
                    self.emit(CopyEvent::ReadError(record));

                    skipped_blocks += record.block_count;
                    cursor += want;
                    stream_position = None;
                }
            }

            progress.current_block = cursor.div_ceil(SECTOR_SIZE);
            progress.skipped_blocks = skipped_blocks;
            if self.event_callback.is_some() {
                self.emit(CopyEvent::Progress(progress.clone()));
            }
        }

        if skipped_blocks > 0 {
            tracing::warn!(
                "There were {} sectors skipped in {}",
                skipped_blocks,
                id.file_name()
            );
        }
        self.emit(CopyEvent::FileFinished {
            id: *id,
            skipped_blocks,
        });

        Ok(FileOutcome::Copied { skipped_blocks })
    }
}

/// Sort records by file and start, folding overlapping or repeated ranges
fn merge_ranges(mut records: Vec<BadSectorRecord>) -> Vec<BadSectorRecord> {
    records.sort_by_key(|r| (r.id, r.start_block));

    let mut merged: Vec<BadSectorRecord> = Vec::with_capacity(records.len());
    for record in records {
        match merged.last_mut() {
            Some(last) if last.id == record.id && record.start_block < last.end_block() => {
                last.block_count = last.end_block().max(record.end_block()) - last.start_block;
            }
            _ => merged.push(record),
        }
    }
    merged
}

/// Range of one file copy, in blocks and bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReadPlan {
    start_block: u64,
    end_block: u64,
    /// Byte offset the copy stops at
    end: u64,
    chunk_blocks: u64,
}

impl ReadPlan {
    fn new(
        source_size: u64,
        output_size: u64,
        resume_from_block: u64,
        max_blocks: Option<u64>,
        chunk_blocks: u64,
    ) -> Self {
        let total_blocks = source_size.div_ceil(SECTOR_SIZE);

        // Without an explicit resume point a copy picks up after the last
        // whole block already in the output.
        let start_block = match (resume_from_block, max_blocks) {
            (0, None) => align_down(output_size, SECTOR_SIZE) / SECTOR_SIZE,
            (block, _) => block,
        }
        .min(total_blocks);

        let end_block = match max_blocks {
            Some(max) => start_block.saturating_add(max).min(total_blocks),
            None => total_blocks,
        };

        Self {
            start_block,
            end_block,
            end: (end_block * SECTOR_SIZE).min(source_size),
            chunk_blocks: chunk_blocks.max(1),
        }
    }

    fn chunk_bytes(&self) -> u64 {
        self.chunk_blocks * SECTOR_SIZE
    }
}

/// Copy the whole disc at `source` into `destination`
pub fn copy(source: &Path, destination: &Path, config: CopyConfig) -> Result<CopySummary> {
    DiscCopier::open(source, destination, config)?.copy_all()
}

/// Retry the ranges recorded in the destination's ledger
pub fn second_pass(
    source: &Path,
    destination: &Path,
    config: CopyConfig,
) -> Result<RepairSummary> {
    DiscCopier::open(source, destination, config)?.second_pass()
}
