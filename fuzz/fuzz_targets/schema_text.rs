//! Fuzz target for fingerprinting arbitrary schema text.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_schema_text
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use strata_migrate::sql_digest;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Invalid SQL is an error, never a panic, and digests are stable.
        if let Ok(first) = sql_digest(input) {
            assert_eq!(sql_digest(input).ok(), Some(first));
        }
    }
});
