//! `strata version` command - Display version information.

use strata_sqlite::rusqlite;

use crate::error::CliResult;
use crate::output::{self, kv};

/// Package version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name
const NAME: &str = env!("CARGO_PKG_NAME");

/// Run the version command
pub async fn run() -> CliResult<()> {
    output::section("strata");

    kv("Version", VERSION);
    kv("Binary", NAME);

    #[cfg(debug_assertions)]
    let build_mode = "debug";
    #[cfg(not(debug_assertions))]
    let build_mode = "release";

    kv("Build", build_mode);
    kv("SQLite", rusqlite::version());

    output::newline();
    output::section("Components");
    kv("strata-sqlite", VERSION);
    kv("strata-migrate", VERSION);

    Ok(())
}
