// autopatch/src/main.rs
//! AutoPatch entry point.
//!
//! Parses the CLI, initializes logging, and dispatches to the command
//! implementations.

use anyhow::Result;
use autopatch::cli::{Cli, Commands};
use autopatch::{commands, logger};
use clap::Parser;

fn main() -> Result<()> {
    // A local .env may carry GH_TOKEN for the patch command.
    dotenvy::dotenv().ok();

    let args = Cli::parse();
    logger::init(args.quiet, args.debug);

    match args.command {
        Commands::Triage(cmd) => commands::triage::run(cmd, args.quiet),
        Commands::Patch(cmd) => commands::patch::run(cmd, args.quiet),
    }
}
