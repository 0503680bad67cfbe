//! Tracing subscriber setup for the CLI.
//!
//! `RUST_LOG` wins when set; otherwise the level follows the `-v` count.
//! `STRATA_LOG_FORMAT=json` switches to JSON lines. Logs always go to stderr
//! so stdout stays parseable.

use std::env;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Log level for a `-v` count
pub fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber.
pub fn init(verbose: u8) {
    let level = level_for(verbose);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            EnvFilter::try_new(format!(
                "strata={level},strata_migrate={level},strata_sqlite={level},strata_cli={level}"
            ))
        })
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let json = env::var("STRATA_LOG_FORMAT").is_ok_and(|f| f == "json");
    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).try_init()
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init()
    };
    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
