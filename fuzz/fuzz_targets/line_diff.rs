//! Fuzz target for the line diff and edit scripts.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_line_diff
//! ```

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use strata_migrate::edit::{EditOp, edit_script, unified};

#[derive(Debug, Arbitrary)]
struct Input {
    lhs: String,
    rhs: String,
    context: u8,
}

fuzz_target!(|input: Input| {
    let out = unified(&input.lhs, &input.rhs, input.context as usize);
    let same = input.lhs.lines().eq(input.rhs.lines());
    assert_eq!(out.is_empty(), same);

    let a: Vec<&str> = input.lhs.lines().collect();
    let b: Vec<&str> = input.rhs.lines().collect();
    for edit in edit_script(&a, &b) {
        match edit.op {
            EditOp::Insert => assert!(edit.lhs.is_empty() && !edit.rhs.is_empty()),
            EditOp::Delete => assert!(!edit.lhs.is_empty() && edit.rhs.is_empty()),
            EditOp::Replace => assert_eq!(edit.lhs.len(), edit.rhs.len()),
        }
        assert!(edit.lhs.end <= a.len() && edit.rhs.end <= b.len());
    }
});
