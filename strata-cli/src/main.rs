//! Strata CLI - schema version control for SQLite.

use clap::Parser;

use strata_cli::cli::{Cli, Command};
use strata_cli::commands;
use strata_cli::config::Config;
use strata_cli::error::CliResult;
use strata_cli::{logging, output};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cwd = std::env::current_dir()?;
    let config = Config::resolve(&cli, &cwd)?;
    output::set_color(config.output.color);

    match cli.command {
        Command::Digest(args) => commands::digest::run(args, &config, &cwd).await,
        Command::Diff(args) => commands::diff::run(args, &config, &cwd).await,
        Command::History(args) => commands::history::run(args, &config).await,
        Command::Apply(args) => commands::apply::run(args, &config, &cwd).await,
        Command::Version => commands::version::run().await,
    }
}
