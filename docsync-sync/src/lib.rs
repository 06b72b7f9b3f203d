//! # docsync-sync
//!
//! Reconciliation engine: keeps one remote page per local markdown document.
//!
//! Flow: [`inventory`] builds the local and remote identity-keyed
//! collections, [`reconcile`] partitions them and classifies update
//! candidates with [`fingerprint`], and [`mutator`] drives the remote store
//! through deletes, creates and updates one call at a time.
//! [`pipeline::run`] wires the steps together for the CLI.

pub mod error;
pub mod fingerprint;
pub mod inventory;
pub mod memory;
pub mod mutator;
pub mod notion;
pub mod pipeline;
pub mod reconcile;
pub mod remote;

pub use error::SyncError;
pub use mutator::{ItemFailure, Mutator, MutatorOptions, Operation, RunSummary};
pub use notion::NotionClient;
pub use reconcile::{ReconciliationPlan, Reconciler};
pub use remote::{ChildKind, ChildRef, RemoteError, RemotePage, RemoteStore};
