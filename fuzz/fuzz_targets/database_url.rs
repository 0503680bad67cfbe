//! Fuzz target for database URL parsing.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_database_url
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use strata_sqlite::SqliteConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Parsing may fail but must not panic.
        if let Ok(config) = SqliteConfig::from_url(input) {
            let _ = config.init_sql();
        }
    }
});
