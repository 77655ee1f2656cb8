//! `ainews`: crawl AI news sources into a local store and enrich them.
//!
//! Meant to be invoked by cron or any other scheduler; each command is one run.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
