//! `docsync sync`: reconcile the remote root with the local folder.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use docsync_core::Title;
use docsync_sync::{pipeline, NotionClient, RunSummary};

use super::ConnectionArgs;

/// Arguments for `docsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Build the plan and report it without changing anything remotely.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the run summary as JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let config = self.connection.resolve()?;
        let client = NotionClient::new(config.token.clone());

        let outcome = pipeline::run(&client, &config, self.dry_run)
            .with_context(|| format!("sync failed for '{}'", config.folder.display()))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&outcome.summary)
                    .context("failed to serialize run summary")?
            );
            return Ok(());
        }

        print_summary(&config.folder.display().to_string(), &outcome.summary);
        Ok(())
    }
}

/// First line of the report; never a check mark when an item failed.
fn headline(folder: &str, summary: &RunSummary) -> String {
    let prefix = if summary.dry_run { "[dry-run] " } else { "" };
    let counts = format!(
        "{} created, {} updated, {} deleted, {} unchanged",
        summary.created.len(),
        summary.updated.len(),
        summary.deleted.len(),
        summary.unchanged.len(),
    );

    if !summary.failed.is_empty() {
        format!(
            "{prefix}{} '{folder}' synced with {} failure(s) ({counts})",
            "✗".red(),
            summary.failed.len()
        )
    } else if !summary.has_changes() {
        format!(
            "{prefix}{} '{folder}' nothing to do ({} unchanged)",
            "✓".green(),
            summary.unchanged.len()
        )
    } else {
        format!("{prefix}{} '{folder}' synced ({counts})", "✓".green())
    }
}

fn print_summary(folder: &str, summary: &RunSummary) {
    println!("{}", headline(folder, summary));

    print_titles("-", &summary.deleted);
    print_titles("+", &summary.created);
    print_titles("✎", &summary.updated);
    print_titles("·", &summary.unchanged);
    for title in &summary.unresolved {
        println!("  {}  {title} (not a child page; skipped)", "?".yellow());
    }

    if !summary.failed.is_empty() {
        println!("{}", format!("{} item(s) failed:", summary.failed.len()).red());
        for failure in &summary.failed {
            println!("  {}  {} ({}): {}", "✗".red(), failure.title, failure.op, failure.error);
        }
    }
}

fn print_titles(marker: &str, titles: &[Title]) {
    for title in titles {
        println!("  {marker}  {title}");
    }
}
