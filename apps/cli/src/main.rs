//! proposalgen CLI: turn a project brief into a formatted `.docx` proposal.
//!
//! Extracts structured proposal fields with an LLM, assembles the proposal
//! document and optionally publishes it to blob storage.

mod commands;
mod mcp;

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
