//! `docsync plan`: show the reconciliation plan without mutating anything.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use docsync_sync::{
    pipeline::{self, Prepared},
    reconcile::PlanSide,
    NotionClient, ReconciliationPlan,
};

use super::ConnectionArgs;

/// Arguments for `docsync plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl PlanArgs {
    pub fn run(self) -> Result<()> {
        let config = self.connection.resolve()?;
        let client = NotionClient::new(config.token.clone());

        let Prepared {
            local,
            remote,
            plan,
        } = pipeline::prepare(&client, &config).context("failed to build plan")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&plan).context("failed to serialize plan JSON")?
            );
            return Ok(());
        }

        println!(
            "docsync v{} | {} local | {} remote | root {}",
            env!("CARGO_PKG_VERSION"),
            local.len(),
            remote.len(),
            config.root,
        );
        print_table(&plan);
        Ok(())
    }
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "title")]
    title: String,
    #[tabled(rename = "action")]
    action: String,
    #[tabled(rename = "detail")]
    detail: String,
}

fn rows(plan: &ReconciliationPlan) -> Vec<PlanRow> {
    let mut rows = Vec::new();
    for item in &plan.to_delete {
        rows.push(PlanRow {
            title: item.title.to_string(),
            action: "DELETE".red().to_string(),
            detail: "no local document".to_string(),
        });
    }
    for title in &plan.to_create {
        rows.push(PlanRow {
            title: title.to_string(),
            action: "CREATE".green().to_string(),
            detail: "new document".to_string(),
        });
    }
    for item in &plan.changed {
        rows.push(PlanRow {
            title: item.title.to_string(),
            action: "UPDATE".yellow().to_string(),
            detail: item.reason.to_string(),
        });
    }
    for title in &plan.unchanged {
        rows.push(PlanRow {
            title: title.to_string(),
            action: "SKIP".bright_black().to_string(),
            detail: "unchanged".to_string(),
        });
    }
    for item in &plan.unresolved {
        let detail = match item.side {
            PlanSide::Update => "remote entry is not a child page",
            PlanSide::Delete => "orphan is not a child page",
        };
        rows.push(PlanRow {
            title: item.title.to_string(),
            action: "UNRESOLVED".magenta().to_string(),
            detail: detail.to_string(),
        });
    }
    rows
}

fn print_table(plan: &ReconciliationPlan) {
    let rows = rows(plan);
    if rows.is_empty() {
        println!("No documents found locally or remotely.");
        return;
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if plan.is_noop() {
        println!("Remote pages are up to date.");
    } else {
        println!("Run 'docsync sync' to apply.");
    }
}
