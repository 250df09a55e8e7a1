//! Binary crate for the `weather` service.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Serving aggregated temperatures over HTTP
//! - Interactive configuration

use clap::Parser;

mod cli;
mod logging;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    logging::init_logging(cmd.log_format);
    cmd.run().await
}
