//! Progress reporting for copy runs
//!
//! The copier emits [`CopyEvent`]s through an observer callback. Progress
//! events carry a [`CopyProgress`] snapshot from which a front end can render
//! the evolving status line.

use crate::layout::{FileId, SECTOR_SIZE};
use crate::ledger::BadSectorRecord;
use std::time::{Duration, Instant};

/// Progress of one file copy
#[derive(Debug, Clone)]
pub struct CopyProgress {
    /// File being copied
    pub id: FileId,
    /// Block the run started at
    pub start_block: u64,
    /// Next block to be read
    pub current_block: u64,
    /// Block the run stops at
    pub end_block: u64,
    /// Blocks skipped so far in this file
    pub skipped_blocks: u64,
    started: Instant,
}

impl CopyProgress {
    /// Start tracking a file copy over `start_block..end_block`
    pub fn new(id: FileId, start_block: u64, end_block: u64) -> Self {
        Self::started_at(id, start_block, end_block, Instant::now())
    }

    /// Start tracking with an explicit start instant
    pub fn started_at(id: FileId, start_block: u64, end_block: u64, started: Instant) -> Self {
        Self {
            id,
            start_block,
            current_block: start_block,
            end_block,
            skipped_blocks: 0,
            started,
        }
    }

    /// Blocks processed in this run
    pub fn blocks_done(&self) -> u64 {
        self.current_block.saturating_sub(self.start_block)
    }

    /// Blocks left to process
    pub fn blocks_remaining(&self) -> u64 {
        self.end_block.saturating_sub(self.current_block)
    }

    /// Completion percentage of this run (0-100)
    pub fn percentage(&self) -> f64 {
        let total = self.blocks_done() + self.blocks_remaining();
        if total == 0 {
            return 100.0;
        }
        (self.blocks_done() as f64 / total as f64) * 100.0
    }

    /// Time since the run started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Estimated duration of the whole run, once something has been read
    pub fn estimated_total(&self) -> Option<Duration> {
        estimate_total(
            self.elapsed(),
            self.blocks_done(),
            self.blocks_remaining(),
        )
    }

    /// Read rate in bytes per second
    pub fn bytes_per_second(&self) -> f64 {
        rate(self.elapsed(), self.blocks_done())
    }

    /// Single-line status text
    pub fn status_line(&self) -> String {
        let mut line = format!(
            "Reading block {:7}/{} ({})",
            self.current_block,
            self.end_block,
            self.id.file_name()
        );

        let elapsed = self.elapsed();
        if let Some(total) = self.estimated_total() {
            line.push_str(&format!(
                " ({} out of {}, {})",
                format_clock(elapsed),
                format_clock(total),
                format_rate(self.bytes_per_second())
            ));
        }
        line
    }
}

/// Estimated total duration, `elapsed * (done + remaining) / done`
pub fn estimate_total(elapsed: Duration, done: u64, remaining: u64) -> Option<Duration> {
    if done == 0 {
        return None;
    }
    let factor = (done + remaining) as f64 / done as f64;
    Some(elapsed.mul_f64(factor))
}

/// Bytes per second for `blocks` sectors read in `elapsed`
pub fn rate(elapsed: Duration, blocks: u64) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    (blocks * SECTOR_SIZE) as f64 / secs
}

/// Format a rate with B/s, kB/s or MB/s (decimal thresholds)
pub fn format_rate(bytes_per_second: f64) -> String {
    if bytes_per_second >= 1e6 {
        format!("{:5.1}MB/s", bytes_per_second / 1e6)
    } else if bytes_per_second >= 1e3 {
        format!("{:5.1}kB/s", bytes_per_second / 1e3)
    } else {
        format!("{:5.1}B/s", bytes_per_second)
    }
}

/// Format a duration as `mm:ss`; minutes keep counting past an hour
pub fn format_clock(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Why a file produced no reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Continuation of a multi-part stream, copied with its first part
    Continuation,
    /// The reader has no such file
    NotFound,
    /// Output already holds the full source size
    AlreadyComplete,
}

/// Observer notification from a copy or repair run
#[derive(Debug, Clone)]
pub enum CopyEvent {
    /// A file copy is starting
    FileStarted {
        /// File being copied
        id: FileId,
        /// First block to read
        start_block: u64,
        /// Block the copy stops at
        end_block: u64,
    },
    /// A chunk was processed
    Progress(CopyProgress),
    /// A chunk could not be read and was skipped
    ReadError(BadSectorRecord),
    /// A file copy finished
    FileFinished {
        /// File that was copied
        id: FileId,
        /// Blocks that could not be read
        skipped_blocks: u64,
    },
    /// A duplicate was hard linked to its original
    Linked {
        /// Duplicate file
        id: FileId,
        /// File it was linked to
        original: FileId,
        /// The link already existed
        already_linked: bool,
    },
    /// A file needed no reads
    Skipped {
        /// File that was skipped
        id: FileId,
        /// Why
        reason: SkipReason,
    },
}

impl CopyEvent {
    /// File this event is about
    pub fn file_id(&self) -> FileId {
        match self {
            Self::FileStarted { id, .. }
            | Self::FileFinished { id, .. }
            | Self::Linked { id, .. }
            | Self::Skipped { id, .. } => *id,
            Self::Progress(p) => p.id,
            Self::ReadError(r) => r.id,
        }
    }
}
