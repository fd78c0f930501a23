//! Runtime configuration for copy and repair runs

use crate::error::{Error, Result};

/// Default number of sectors requested per read on the first pass
pub const DEFAULT_CHUNK_BLOCKS: u64 = 128;

/// Default number of sectors requested per read on the repair pass
pub const DEFAULT_REPAIR_CHUNK_BLOCKS: u64 = 1;

/// Smallest allowed chunk
pub const MIN_CHUNK_BLOCKS: u64 = 1;

/// Largest allowed chunk (2 MiB of sectors)
pub const MAX_CHUNK_BLOCKS: u64 = 1024;

/// Default ledger file name, created at the destination root
pub const DEFAULT_LEDGER_FILE_NAME: &str = "dvdsalvage.bad";

/// Copy run configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyConfig {
    /// Sectors per read request during a copy
    pub chunk_blocks: u64,

    /// Sectors per read request during a repair
    pub repair_chunk_blocks: u64,

    /// Ledger file name relative to the destination root
    pub ledger_file_name: String,

    /// Emit per-chunk detail
    pub verbose: bool,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            chunk_blocks: DEFAULT_CHUNK_BLOCKS,
            repair_chunk_blocks: DEFAULT_REPAIR_CHUNK_BLOCKS,
            ledger_file_name: DEFAULT_LEDGER_FILE_NAME.to_string(),
            verbose: false,
        }
    }
}

impl CopyConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the copy chunk size, clamped to the supported range
    pub fn chunk_blocks(mut self, blocks: u64) -> Self {
        self.chunk_blocks = blocks.clamp(MIN_CHUNK_BLOCKS, MAX_CHUNK_BLOCKS);
        self
    }

    /// Set the repair chunk size, clamped to the supported range
    pub fn repair_chunk_blocks(mut self, blocks: u64) -> Self {
        self.repair_chunk_blocks = blocks.clamp(MIN_CHUNK_BLOCKS, MAX_CHUNK_BLOCKS);
        self
    }

    /// Set the ledger file name
    pub fn ledger_file_name(mut self, name: impl Into<String>) -> Self {
        self.ledger_file_name = name.into();
        self
    }

    /// Set verbose mode
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Check values that the builder cannot clamp
    pub fn validate(&self) -> Result<()> {
        let name = self.ledger_file_name.trim();
        if name.is_empty() {
            return Err(Error::InvalidConfig(
                "ledger file name must not be empty".to_string(),
            ));
        }
        if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
            return Err(Error::InvalidConfig(format!(
                "ledger file name must be a plain file name, got {:?}",
                self.ledger_file_name
            )));
        }
        if !(MIN_CHUNK_BLOCKS..=MAX_CHUNK_BLOCKS).contains(&self.chunk_blocks)
            || !(MIN_CHUNK_BLOCKS..=MAX_CHUNK_BLOCKS).contains(&self.repair_chunk_blocks)
        {
            return Err(Error::InvalidConfig(format!(
                "chunk sizes must be between {} and {} sectors",
                MIN_CHUNK_BLOCKS, MAX_CHUNK_BLOCKS
            )));
        }
        Ok(())
    }
}
