//! Fuzz test for sector alignment helpers
//!
//! Offsets on a DVD never exceed a few GiB, so values are drawn from u32.

#![no_main]

use arbitrary::Arbitrary;
use dvdsalvage_platform::{align_down, align_up, is_aligned};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct AlignmentInput {
    value: u32,
    alignment: u16,
}

fuzz_target!(|input: AlignmentInput| {
    let value = u64::from(input.value);
    let alignment = u64::from(input.alignment);

    if alignment == 0 {
        assert_eq!(align_up(value, alignment), value);
        assert_eq!(align_down(value, alignment), value);
        assert!(is_aligned(value, alignment));
        return;
    }

    let up = align_up(value, alignment);
    let down = align_down(value, alignment);

    assert!(up >= value, "align_up({value}, {alignment}) = {up}");
    assert!(up - value < alignment, "align_up({value}, {alignment}) overshoots");
    assert!(down <= value, "align_down({value}, {alignment}) = {down}");
    assert!(value - down < alignment, "align_down({value}, {alignment}) undershoots");

    assert!(is_aligned(up, alignment));
    assert!(is_aligned(down, alignment));
    assert_eq!(is_aligned(value, alignment), up == value);
    assert_eq!(is_aligned(value, alignment), down == value);
});
