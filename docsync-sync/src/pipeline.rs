//! Shared sync pipeline entrypoint used by the `sync` and `plan` commands.

use docsync_core::SyncConfig;
use docsync_render::{LinkPolicy, Transformer};

use crate::inventory::{self, LocalInventory, RemoteInventory};
use crate::mutator::{Mutator, MutatorOptions, RunSummary};
use crate::reconcile::{ReconciliationPlan, Reconciler};
use crate::remote::RemoteStore;
use crate::SyncError;

/// Both inventories and the plan computed from them.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub local: LocalInventory,
    pub remote: RemoteInventory,
    pub plan: ReconciliationPlan,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub plan: ReconciliationPlan,
    pub summary: RunSummary,
}

/// Build both inventories and reconcile them. Issues read-only calls only.
pub fn prepare<S: RemoteStore + ?Sized>(
    store: &S,
    config: &SyncConfig,
) -> Result<Prepared, SyncError> {
    let remote = inventory::list_remote(store, &config.root)?;
    let local = inventory::list_local(config)?;
    let plan = Reconciler::new(store, config.policy).plan(&local, &remote)?;
    Ok(Prepared {
        local,
        remote,
        plan,
    })
}

/// Run one reconciliation. With `dry_run`, stop after planning.
pub fn run<S: RemoteStore + ?Sized>(
    store: &S,
    config: &SyncConfig,
    dry_run: bool,
) -> Result<RunOutcome, SyncError> {
    let Prepared { local, plan, .. } = prepare(store, config)?;

    if dry_run {
        let summary = RunSummary::from_plan(&plan);
        return Ok(RunOutcome { plan, summary });
    }

    let transformer = Transformer::new(LinkPolicy::new(config.base_url.as_deref()));
    let summary =
        Mutator::new(store, &transformer, MutatorOptions::from_config(config)).execute(&plan, &local)?;
    tracing::info!(
        created = summary.created.len(),
        updated = summary.updated.len(),
        deleted = summary.deleted.len(),
        unchanged = summary.unchanged.len(),
        failed = summary.failed.len(),
        "sync finished"
    );
    Ok(RunOutcome { plan, summary })
}
