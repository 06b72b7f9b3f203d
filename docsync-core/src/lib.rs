//! docsync core library — domain types, configuration, errors.
//!
//! Public API surface:
//! - [`types`] — newtypes and the failure policy
//! - [`config`] — layered configuration (CLI / env / YAML file / defaults)
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{ConfigLayer, SyncConfig};
pub use error::ConfigError;
pub use types::{ApiToken, FailurePolicy, PageId, Title};
