//! Styled terminal output utilities.
//!
//! Machine-readable results (digests, diffs, history lines) go to stdout
//! unstyled. Everything else goes through these helpers, which honour the
//! color setting.

use std::sync::atomic::{AtomicBool, Ordering};

use owo_colors::OwoColorize;
use strata_migrate::LogSink;

static COLOR: AtomicBool = AtomicBool::new(true);

/// Enable or disable colored output
pub fn set_color(enabled: bool) {
    COLOR.store(enabled, Ordering::Relaxed);
}

fn color() -> bool {
    COLOR.load(Ordering::Relaxed)
}

/// Print a header/title
pub fn header(text: &str) {
    println!();
    if color() {
        println!("{}", text.bold().cyan());
        println!("{}", "─".repeat(text.chars().count()).dimmed());
    } else {
        println!("{}", text);
        println!("{}", "─".repeat(text.chars().count()));
    }
    println!();
}

/// Print a section header
pub fn section(text: &str) {
    if color() {
        println!("{}", text.bold().white());
    } else {
        println!("{}", text);
    }
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    if color() {
        println!("  {}: {}", key.dimmed(), value);
    } else {
        println!("  {}: {}", key, value);
    }
}

/// Print a success message
pub fn success(text: &str) {
    if color() {
        println!("{} {}", "✔".green().bold(), text.green());
    } else {
        println!("✔ {}", text);
    }
}

/// Print a warning message
pub fn warn(text: &str) {
    if color() {
        eprintln!("{} {}", "⚠".yellow().bold(), text.yellow());
    } else {
        eprintln!("⚠ {}", text);
    }
}

/// Print an error message
pub fn error(text: &str) {
    if color() {
        eprintln!("{} {}", "✖".red().bold(), text.red());
    } else {
        eprintln!("✖ {}", text);
    }
}

/// Print a list item
pub fn list_item(text: &str) {
    if color() {
        println!("  {} {}", "•".dimmed(), text);
    } else {
        println!("  • {}", text);
    }
}

/// Print a newline
pub fn newline() {
    println!();
}

/// Print dimmed text
pub fn dim(text: &str) {
    if color() {
        println!("{}", text.dimmed());
    } else {
        println!("{}", text);
    }
}

/// Forwards engine progress messages to the terminal as list items.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn log(&self, message: &str) {
        list_item(message);
    }
}
