//! CLI command implementations

pub mod config;
pub mod copy;
pub mod list;
pub mod repair;

/// Conditionally println based on silent mode
macro_rules! println_if {
    ($silent:expr) => {
        if !$silent {
            println!();
        }
    };
    ($silent:expr, $($arg:tt)*) => {
        if !$silent {
            println!($($arg)*);
        }
    };
}

pub(crate) use println_if;

/// Runtime config from the saved settings and command-line overrides
///
/// `chunk_blocks` applies to whichever pass the command runs.
pub(crate) fn copy_config(
    settings: &dvdsalvage_core::CopySettings,
    chunk_blocks: Option<u64>,
    repair: bool,
    verbose: bool,
) -> dvdsalvage_core::CopyConfig {
    let config = settings.to_config().verbose(verbose);
    let config = match chunk_blocks {
        Some(n) if repair => config.repair_chunk_blocks(n),
        Some(n) => config.chunk_blocks(n),
        None => config,
    };
    tracing::debug!(
        "Chunk size {} sectors, repair chunk size {} sectors, ledger {}",
        config.chunk_blocks,
        config.repair_chunk_blocks,
        config.ledger_file_name
    );
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvdsalvage_core::{CopySettings, DEFAULT_CHUNK_BLOCKS, DEFAULT_REPAIR_CHUNK_BLOCKS};

    #[test]
    fn test_copy_config_defaults() {
        let config = copy_config(&CopySettings::default(), None, false, false);
        assert_eq!(config.chunk_blocks, DEFAULT_CHUNK_BLOCKS);
        assert_eq!(config.repair_chunk_blocks, DEFAULT_REPAIR_CHUNK_BLOCKS);
        assert!(!config.verbose);
    }

    #[test]
    fn test_copy_config_override_targets_pass() {
        let settings = CopySettings::default();

        let copy = copy_config(&settings, Some(16), false, true);
        assert_eq!(copy.chunk_blocks, 16);
        assert_eq!(copy.repair_chunk_blocks, DEFAULT_REPAIR_CHUNK_BLOCKS);
        assert!(copy.verbose);

        let repair = copy_config(&settings, Some(4), true, false);
        assert_eq!(repair.chunk_blocks, DEFAULT_CHUNK_BLOCKS);
        assert_eq!(repair.repair_chunk_blocks, 4);
    }

    #[test]
    fn test_copy_config_uses_settings() {
        let settings = CopySettings {
            chunk_blocks: 32,
            repair_chunk_blocks: 2,
            ledger_file_name: "bad.txt".to_string(),
        };
        let config = copy_config(&settings, None, false, false);
        assert_eq!(config.chunk_blocks, 32);
        assert_eq!(config.repair_chunk_blocks, 2);
        assert_eq!(config.ledger_file_name, "bad.txt");
    }
}
