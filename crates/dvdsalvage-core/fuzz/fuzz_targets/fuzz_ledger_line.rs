//! Fuzz test for ledger line parsing
//!
//! Any line that parses must format back to a line that parses to the same
//! record.

#![no_main]

use dvdsalvage_core::BadSectorRecord;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Some(record) = BadSectorRecord::parse_line(data) {
        assert!(record.block_count > 0);
        assert!(record.id.number > 0);

        let line = record.to_line();
        assert_eq!(BadSectorRecord::parse_line(&line), Some(record));
    }
});
