//! # dvdsalvage Core
//!
//! Core library for copying the file structure of a video DVD while
//! tolerating unreadable sectors.
//!
//! ## Modules
//!
//! - `layout`: Logical file identities, `VIDEO_TS` naming and the file table
//! - `inventory`: Listing a disc's files and detecting duplicates
//! - `reader`: Reading logical files as byte or block streams
//! - `output`: Destination tree and output sinks
//! - `ledger`: The persisted bad-sector ledger
//! - `copier`: Copy and repair orchestration
//! - `progress`: Progress snapshots and observer events
//! - `error`: Error types and result aliases
//! - `config`: Runtime configuration
//! - `settings`: Persistent user settings from configuration file
//!
//! ## Example
//!
//! ```ignore
//! use dvdsalvage_core::{CopyConfig, CopyEvent, DiscCopier};
//! use std::path::Path;
//!
//! let config = CopyConfig::new().chunk_blocks(64);
//! let mut copier = DiscCopier::open(Path::new("/media/dvd"), Path::new("movie"), config)?
//!     .on_event(|e| {
//!         if let CopyEvent::Progress(p) = e {
//!             eprint!("\r{}", p.status_line());
//!         }
//!     });
//!
//! let summary = copier.copy_all()?;
//! println!("{} sectors could not be read", summary.missing_sectors);
//!
//! // Later, with a cleaned disc or another drive:
//! let repair = copier.second_pass()?;
//! println!("{} sectors still missing", repair.total_missing);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod copier;
pub mod error;
pub mod inventory;
pub mod layout;
pub mod ledger;
pub mod output;
pub mod progress;
pub mod reader;
pub mod settings;

pub use config::{
    CopyConfig, DEFAULT_CHUNK_BLOCKS, DEFAULT_LEDGER_FILE_NAME, DEFAULT_REPAIR_CHUNK_BLOCKS,
    MAX_CHUNK_BLOCKS, MIN_CHUNK_BLOCKS,
};
pub use copier::{
    copy, second_pass, CopySummary, DiscCopier, EventCallback, FileOutcome, RepairOutcome,
    RepairSummary,
};
pub use error::{Error, Result};
pub use inventory::{find_video_ts, Inventory, VideoTsInventory};
pub use layout::{
    Domain, FileId, FileTable, LogicalFile, StreamKind, MAX_VOB_PART_BLOCKS, SECTOR_SIZE,
};
pub use ledger::{BadSectorLedger, BadSectorRecord, LedgerContents, MalformedLine};
pub use output::{FileSink, OutputSink, OutputTree};
pub use progress::{format_clock, format_rate, CopyEvent, CopyProgress, SkipReason};
pub use reader::{DiscReader, DiscStream, VideoTsReader, VideoTsStream};
pub use settings::{BehaviorSettings, CopySettings, Settings, SettingsError};

/// List the logical files of the disc at `source`
pub fn list_files(source: &std::path::Path) -> Result<FileTable> {
    if !source.exists() {
        return Err(Error::SourceNotFound(source.display().to_string()));
    }
    let files = VideoTsInventory::new(source).list_files()?;
    Ok(FileTable::new(files))
}
