//! TopicForge CLI: batch-resolve topic titles into research briefs.
//!
//! Titles come from a file (free-form text or one per line); results are
//! cached locally and exported as a markdown document.

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
