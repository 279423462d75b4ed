//! alignwatch CLI: follow alignment jobs to completion and browse their results.
//!
//! Polls the results server with backoff, assembles the result artifacts,
//! and prints alignments, highlighted reading frames, and ranked hits.

mod commands;
mod render;

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
