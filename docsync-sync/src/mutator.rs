//! Executes a [`ReconciliationPlan`] against the remote store.
//!
//! ## Guarantees
//!
//! 1. One remote call in flight at a time: a single control loop drains an
//!    ordered work queue, each step a blocking call.
//! 2. Consecutive mutating calls are spaced by at least the configured delay.
//! 3. Deletes run first, then creates, then content replacements; each list
//!    keeps its construction order.
//! 4. A per-item failure aborts only that item under
//!    [`FailurePolicy::Ignore`] and the whole run under
//!    [`FailurePolicy::Strict`]. Nothing is rolled back.

use std::collections::VecDeque;
use std::fmt;
use std::thread::sleep;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use docsync_core::{FailurePolicy, PageId, SyncConfig, Title};
use docsync_render::{Block, Transformer, MAX_BLOCKS_PER_REQUEST};

use crate::error::{mutation_err, SyncError};
use crate::fingerprint;
use crate::inventory::{LocalDocument, LocalInventory};
use crate::reconcile::{DeleteItem, ReconciliationPlan, UpdateItem};
use crate::remote::{RemoteError, RemoteStore};

/// Upper bound on list-then-delete passes when emptying one page.
const MAX_CLEAR_PASSES: usize = 50;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Delete,
    Create,
    Update,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Delete => write!(f, "delete"),
            Operation::Create => write!(f, "create"),
            Operation::Update => write!(f, "update"),
        }
    }
}

/// A per-item failure tolerated under the ignore policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub title: Title,
    pub op: Operation,
    pub error: String,
}

/// What one run did (or, in dry-run mode, would do).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub dry_run: bool,
    pub deleted: Vec<Title>,
    pub created: Vec<Title>,
    pub updated: Vec<Title>,
    pub unchanged: Vec<Title>,
    pub unresolved: Vec<Title>,
    pub failed: Vec<ItemFailure>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunSummary {
    /// The summary a dry run reports: the plan, nothing executed.
    pub fn from_plan(plan: &ReconciliationPlan) -> Self {
        Self {
            dry_run: true,
            deleted: plan.to_delete.iter().map(|d| d.title.clone()).collect(),
            created: plan.to_create.clone(),
            updated: plan.changed.iter().map(|u| u.title.clone()).collect(),
            unchanged: plan.unchanged.clone(),
            unresolved: plan.unresolved.iter().map(|u| u.title.clone()).collect(),
            failed: Vec::new(),
            finished_at: Some(Utc::now()),
        }
    }

    pub fn has_changes(&self) -> bool {
        !(self.deleted.is_empty() && self.created.is_empty() && self.updated.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Throttle
// ---------------------------------------------------------------------------

/// Minimum spacing between consecutive mutating calls.
#[derive(Debug)]
pub struct Throttle {
    delay: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self { delay, last: None }
    }

    /// Run one mutating call, first waiting out the remainder of the delay
    /// since the previous one.
    pub fn mutate<T>(&mut self, call: impl FnOnce() -> T) -> T {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                sleep(self.delay - elapsed);
            }
        }
        let result = call();
        self.last = Some(Instant::now());
        result
    }
}

// ---------------------------------------------------------------------------
// Mutator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MutatorOptions {
    /// Container new entries are created under.
    pub root: PageId,
    pub policy: FailurePolicy,
    pub delay: Duration,
}

impl MutatorOptions {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            root: config.root.clone(),
            policy: config.policy,
            delay: config.delay,
        }
    }
}

enum Action<'p> {
    Delete(&'p DeleteItem),
    Create(&'p LocalDocument),
    Update(&'p UpdateItem, &'p LocalDocument),
}

impl Action<'_> {
    fn title(&self) -> &Title {
        match self {
            Action::Delete(item) => &item.title,
            Action::Create(doc) => &doc.title,
            Action::Update(item, _) => &item.title,
        }
    }

    fn op(&self) -> Operation {
        match self {
            Action::Delete(_) => Operation::Delete,
            Action::Create(_) => Operation::Create,
            Action::Update(..) => Operation::Update,
        }
    }
}

pub struct Mutator<'a, S: RemoteStore + ?Sized> {
    store: &'a S,
    transformer: &'a Transformer,
    options: MutatorOptions,
    throttle: Throttle,
}

impl<'a, S: RemoteStore + ?Sized> Mutator<'a, S> {
    pub fn new(store: &'a S, transformer: &'a Transformer, options: MutatorOptions) -> Self {
        let throttle = Throttle::new(options.delay);
        Self {
            store,
            transformer,
            options,
            throttle,
        }
    }

    /// Execute `plan`, looking up document content in `local`.
    pub fn execute(
        &mut self,
        plan: &ReconciliationPlan,
        local: &LocalInventory,
    ) -> Result<RunSummary, SyncError> {
        let mut summary = RunSummary {
            unchanged: plan.unchanged.clone(),
            unresolved: plan.unresolved.iter().map(|u| u.title.clone()).collect(),
            ..RunSummary::default()
        };

        let mut queue: VecDeque<Action<'_>> = VecDeque::new();
        queue.extend(plan.to_delete.iter().map(Action::Delete));
        for title in &plan.to_create {
            match local.get(title) {
                Some(doc) => queue.push_back(Action::Create(doc)),
                None => tracing::warn!(title = %title, "planned document missing locally; skipped"),
            }
        }
        for item in &plan.changed {
            match local.get(&item.title) {
                Some(doc) => queue.push_back(Action::Update(item, doc)),
                None => tracing::warn!(title = %item.title, "planned document missing locally; skipped"),
            }
        }

        while let Some(action) = queue.pop_front() {
            let title = action.title().clone();
            let op = action.op();
            let result = match action {
                Action::Delete(item) => self.delete_entry(item),
                Action::Create(doc) => self.create_entry(doc),
                Action::Update(item, doc) => self.replace_entry(item, doc),
            };
            match result {
                Ok(()) => {
                    tracing::info!(title = %title, op = %op, "done");
                    match op {
                        Operation::Delete => summary.deleted.push(title),
                        Operation::Create => summary.created.push(title),
                        Operation::Update => summary.updated.push(title),
                    }
                }
                Err(err) => match self.options.policy {
                    FailurePolicy::Strict => return Err(err),
                    FailurePolicy::Ignore => {
                        tracing::error!(title = %title, op = %op, error = %err, "item failed; continuing");
                        summary.failed.push(ItemFailure {
                            title,
                            op,
                            error: err.to_string(),
                        });
                    }
                },
            }
        }

        summary.finished_at = Some(Utc::now());
        Ok(summary)
    }

    /// Remove every child of the entry, then archive the entry's page.
    fn delete_entry(&mut self, item: &DeleteItem) -> Result<(), SyncError> {
        self.clear_children(&item.page)
            .map_err(|e| mutation_err(Operation::Delete, &item.title, e))?;
        let store = self.store;
        self.throttle
            .mutate(|| store.delete_block(&item.page))
            .map_err(|e| mutation_err(Operation::Delete, &item.title, e))
    }

    /// Create the page, then append the document's blocks and marker.
    ///
    /// An append failure leaves a created but empty (or partial) page behind.
    fn create_entry(&mut self, doc: &LocalDocument) -> Result<(), SyncError> {
        let blocks = self.render(doc);
        let store = self.store;
        let root = &self.options.root;
        let page = self
            .throttle
            .mutate(|| store.create_page(root, doc.title.as_str()))
            .map_err(|e| mutation_err(Operation::Create, &doc.title, e))?;
        tracing::debug!(title = %doc.title, page = %page.id, "page created");

        self.append_document(&page.id, &blocks)
            .map_err(|e| mutation_err(Operation::Create, &doc.title, e))
    }

    /// Delete all existing children, then append fresh content and marker.
    ///
    /// Under the ignore policy an append failure is recorded in the page
    /// itself: one diagnostic block is appended in place of the content.
    fn replace_entry(&mut self, item: &UpdateItem, doc: &LocalDocument) -> Result<(), SyncError> {
        self.clear_children(&item.page)
            .map_err(|e| mutation_err(Operation::Update, &item.title, e))?;

        let blocks = self.render(doc);
        let Err(source) = self.append_document(&item.page, &blocks) else {
            return Ok(());
        };

        if self.options.policy == FailurePolicy::Ignore {
            let store = self.store;
            let diagnostic = [diagnostic_block(&source)];
            if let Err(err) = self
                .throttle
                .mutate(|| store.append_children(&item.page, &diagnostic))
            {
                tracing::warn!(title = %item.title, error = %err, "could not append diagnostic block");
            }
        }
        Err(mutation_err(Operation::Update, &item.title, source))
    }

    /// Delete the children of `page` oldest-first until a listing comes back
    /// empty.
    fn clear_children(&mut self, page: &PageId) -> Result<(), RemoteError> {
        let store = self.store;
        for _ in 0..MAX_CLEAR_PASSES {
            let children = store.list_children(page)?;
            if children.is_empty() {
                return Ok(());
            }
            for child in &children {
                self.throttle.mutate(|| store.delete_block(&child.id))?;
                tracing::debug!(page = %page, block = %child.id, "block deleted");
            }
        }
        Err(RemoteError::Incomplete {
            resource: format!("page {page}"),
            passes: MAX_CLEAR_PASSES,
        })
    }

    /// Append rendered content ending in the marker block.
    ///
    /// When part of the content needs follow-up requests the marker goes in
    /// a request of its own, so it is only present once everything else is.
    fn append_document(&mut self, page: &PageId, blocks: &[Block]) -> Result<(), RemoteError> {
        let Some((marker, content)) = blocks.split_last() else {
            return Ok(());
        };
        if content.iter().all(|b| b.split_children().1.is_empty()) {
            return self.append_tree(page, blocks);
        }
        self.append_tree(page, content)?;
        self.append_tree(page, std::slice::from_ref(marker))
    }

    /// Append `blocks` under `parent` in request-sized chunks, then each
    /// block's deferred children under the id it was given.
    fn append_tree(&mut self, parent: &PageId, blocks: &[Block]) -> Result<(), RemoteError> {
        let store = self.store;
        for chunk in blocks.chunks(MAX_BLOCKS_PER_REQUEST) {
            let ids = self.throttle.mutate(|| store.append_children(parent, chunk))?;
            if ids.len() != chunk.len() {
                return Err(RemoteError::Decode(format!(
                    "appended {} blocks under {parent}, got {} ids",
                    chunk.len(),
                    ids.len()
                )));
            }
            for (block, id) in chunk.iter().zip(&ids) {
                let (_, deferred) = block.split_children();
                if !deferred.is_empty() {
                    tracing::debug!(parent = %parent, block = %id, count = deferred.len(), "appending deferred children");
                    self.append_tree(id, &deferred)?;
                }
            }
        }
        Ok(())
    }

    fn render(&self, doc: &LocalDocument) -> Vec<Block> {
        fingerprint::with_marker(self.transformer.to_blocks(&doc.content), &doc.digest)
    }
}

/// The block appended instead of content when a replacement fails.
pub fn diagnostic_block(error: &RemoteError) -> Block {
    Block::paragraph(format!("docsync: content update failed: {error}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttle_spaces_consecutive_calls() {
        let mut throttle = Throttle::new(Duration::from_millis(30));
        let start = Instant::now();
        throttle.mutate(|| ());
        throttle.mutate(|| ());
        throttle.mutate(|| ());
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn throttle_does_not_delay_first_call() {
        let mut throttle = Throttle::new(Duration::from_secs(5));
        let start = Instant::now();
        assert_eq!(throttle.mutate(|| 7), 7);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn dry_run_summary_mirrors_plan() {
        let plan = ReconciliationPlan {
            to_create: vec![Title::from("README")],
            unchanged: vec![Title::from("a")],
            ..ReconciliationPlan::default()
        };
        let summary = RunSummary::from_plan(&plan);
        assert!(summary.dry_run);
        assert_eq!(summary.created, vec![Title::from("README")]);
        assert_eq!(summary.unchanged, vec![Title::from("a")]);
        assert!(summary.has_changes());
    }

    /// A store whose pages never empty: every listing returns one child and
    /// deletes succeed without removing it.
    struct Sticky;

    impl RemoteStore for Sticky {
        fn retrieve_page(&self, id: &PageId) -> Result<crate::remote::RemotePage, RemoteError> {
            Err(RemoteError::NotFound {
                resource: id.to_string(),
            })
        }

        fn list_children(&self, _id: &PageId) -> Result<Vec<crate::remote::ChildRef>, RemoteError> {
            Ok(vec![crate::remote::ChildRef {
                id: PageId::from("stuck"),
                kind: crate::remote::ChildKind::Content("paragraph".into()),
                title: None,
                plain_text: Some("stuck".into()),
            }])
        }

        fn create_page(&self, _parent: &PageId, _title: &str) -> Result<crate::remote::RemotePage, RemoteError> {
            unreachable!("not used")
        }

        fn append_children(&self, _id: &PageId, _blocks: &[Block]) -> Result<Vec<PageId>, RemoteError> {
            unreachable!("not used")
        }

        fn delete_block(&self, _id: &PageId) -> Result<(), RemoteError> {
            Ok(())
        }
    }

    #[test]
    fn clearing_a_page_that_never_empties_is_incomplete() {
        let transformer = Transformer::new(docsync_render::LinkPolicy::new(None));
        let options = MutatorOptions {
            root: PageId::from("root"),
            policy: FailurePolicy::Strict,
            delay: Duration::ZERO,
        };
        let mut mutator = Mutator::new(&Sticky, &transformer, options);
        let err = mutator.clear_children(&PageId::from("p1")).unwrap_err();
        assert_eq!(
            err,
            RemoteError::Incomplete {
                resource: "page p1".into(),
                passes: MAX_CLEAR_PASSES,
            }
        );
        assert!(err.to_string().contains("still has children after 50"));
    }

    #[test]
    fn diagnostic_names_the_error() {
        let block = diagnostic_block(&RemoteError::Api {
            status: 400,
            message: "body failed validation".into(),
        });
        assert!(block.plain_text().contains("body failed validation"));
    }
}
