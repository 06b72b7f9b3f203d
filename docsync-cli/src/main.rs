//! docsync — publish a folder of markdown documents as remote pages.
//!
//! # Usage
//!
//! ```text
//! docsync sync --folder <dir> --token <secret> --root <page-id|url> [--dry-run] [--json]
//! docsync plan --folder <dir> --token <secret> --root <page-id|url> [--json]
//! ```
//!
//! Every option can also come from the environment or from
//! `<config_dir>/docsync/config.yaml`.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{plan::PlanArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "docsync",
    version,
    about = "Keep a remote page tree in step with a local markdown folder",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create, replace and delete remote pages to match the local folder.
    Sync(SyncArgs),

    /// Show what a sync would do without changing anything.
    Plan(PlanArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Plan(args) => args.run(),
    }
}
