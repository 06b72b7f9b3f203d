//! Partitions the two inventories by identity and classifies update
//! candidates by fingerprint.
//!
//! ```text
//! to_create = L \ R        (local order, index first)
//! to_update = L ∩ R        (local order)  → changed | unchanged
//! to_delete = R \ L        (remote listing order)
//! ```

use std::collections::HashSet;

use serde::Serialize;

use docsync_core::{FailurePolicy, PageId, Title};

use crate::error::SyncError;
use crate::fingerprint::{self, ChangeReason, Freshness};
use crate::inventory::{LocalInventory, RemoteInventory};
use crate::remote::RemoteStore;

/// Pure identity partition of two inventories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub to_create: Vec<Title>,
    pub to_update: Vec<Title>,
    pub to_delete: Vec<Title>,
}

/// Split `local` and `remote` identities into create / update / delete.
pub fn partition(local: &[Title], remote: &[Title]) -> Partition {
    let local_set: HashSet<&Title> = local.iter().collect();
    let remote_set: HashSet<&Title> = remote.iter().collect();

    let (to_update, to_create): (Vec<Title>, Vec<Title>) = local
        .iter()
        .cloned()
        .partition(|title| remote_set.contains(title));
    let to_delete = remote
        .iter()
        .filter(|title| !local_set.contains(title))
        .cloned()
        .collect();

    Partition {
        to_create,
        to_update,
        to_delete,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteItem {
    pub title: Title,
    pub page: PageId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateItem {
    pub title: Title,
    pub page: PageId,
    pub reason: ChangeReason,
}

/// Which action set an unresolved identity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanSide {
    Update,
    Delete,
}

/// An identity whose remote side is not a child page; skipped with a warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unresolved {
    pub title: Title,
    pub side: PlanSide,
}

/// The actions for one run. The identity sets are pairwise disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationPlan {
    pub to_delete: Vec<DeleteItem>,
    pub to_create: Vec<Title>,
    pub changed: Vec<UpdateItem>,
    pub unchanged: Vec<Title>,
    pub unresolved: Vec<Unresolved>,
}

impl ReconciliationPlan {
    /// True when executing the plan would issue no mutation.
    pub fn is_noop(&self) -> bool {
        self.to_delete.is_empty() && self.to_create.is_empty() && self.changed.is_empty()
    }
}

/// Builds a [`ReconciliationPlan`] using one `list_children` read per update
/// candidate.
pub struct Reconciler<'a, S: RemoteStore + ?Sized> {
    store: &'a S,
    policy: FailurePolicy,
}

impl<'a, S: RemoteStore + ?Sized> Reconciler<'a, S> {
    pub fn new(store: &'a S, policy: FailurePolicy) -> Self {
        Self { store, policy }
    }

    pub fn plan(
        &self,
        local: &LocalInventory,
        remote: &RemoteInventory,
    ) -> Result<ReconciliationPlan, SyncError> {
        let parts = partition(&local.titles(), &remote.titles());
        let mut plan = ReconciliationPlan {
            to_create: parts.to_create,
            ..ReconciliationPlan::default()
        };

        for title in parts.to_delete {
            match remote.get(&title).and_then(|e| e.page_handle()) {
                Some(page) => plan.to_delete.push(DeleteItem {
                    page: page.clone(),
                    title,
                }),
                None => {
                    tracing::warn!(title = %title, "orphaned remote entry is not a child page; skipped");
                    plan.unresolved.push(Unresolved {
                        title,
                        side: PlanSide::Delete,
                    });
                }
            }
        }

        for title in parts.to_update {
            let (Some(page), Some(doc)) = (
                remote.get(&title).and_then(|e| e.page_handle()),
                local.get(&title),
            ) else {
                tracing::warn!(title = %title, "no child page found for document; skipped");
                plan.unresolved.push(Unresolved {
                    title,
                    side: PlanSide::Update,
                });
                continue;
            };

            match self.freshness(&title, page, &doc.digest)? {
                Freshness::Unchanged => {
                    tracing::debug!(title = %title, "unchanged");
                    plan.unchanged.push(title);
                }
                Freshness::Changed(reason) => {
                    tracing::debug!(title = %title, reason = %reason, "changed");
                    plan.changed.push(UpdateItem {
                        page: page.clone(),
                        title,
                        reason,
                    });
                }
            }
        }

        tracing::info!(
            delete = plan.to_delete.len(),
            create = plan.to_create.len(),
            update = plan.changed.len(),
            unchanged = plan.unchanged.len(),
            unresolved = plan.unresolved.len(),
            "reconciliation plan ready"
        );
        Ok(plan)
    }

    fn freshness(&self, title: &Title, page: &PageId, digest: &str) -> Result<Freshness, SyncError> {
        match self.store.list_children(page) {
            Ok(children) => Ok(fingerprint::compare(&children, digest)),
            Err(source) => match self.policy {
                FailurePolicy::Strict => Err(SyncError::Fingerprint {
                    title: title.clone(),
                    source,
                }),
                FailurePolicy::Ignore => {
                    tracing::warn!(title = %title, error = %source, "could not read fingerprint; treating as changed");
                    Ok(Freshness::Changed(ChangeReason::Unreadable))
                }
            },
        }
    }
}
