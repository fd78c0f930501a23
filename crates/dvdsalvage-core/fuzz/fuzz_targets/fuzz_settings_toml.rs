//! Fuzz test for settings TOML parsing
//!
//! Settings deserialization must handle arbitrary TOML without panicking and
//! always yield a usable copy config.

#![no_main]

use dvdsalvage_core::{CopySettings, Settings, MAX_CHUNK_BLOCKS, MIN_CHUNK_BLOCKS};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(settings) = toml::from_str::<Settings>(data) {
        let _ = toml::to_string_pretty(&settings);

        let config = settings.copy.to_config();
        assert!((MIN_CHUNK_BLOCKS..=MAX_CHUNK_BLOCKS).contains(&config.chunk_blocks));
        assert!((MIN_CHUNK_BLOCKS..=MAX_CHUNK_BLOCKS).contains(&config.repair_chunk_blocks));
    }

    let wrapped = format!("[copy]\n{}", data);
    let _: Result<Settings, _> = toml::from_str(&wrapped);
    let _: Result<CopySettings, _> = toml::from_str(data);
});
