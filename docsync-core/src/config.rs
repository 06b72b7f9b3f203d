//! Layered run configuration.
//!
//! # Resolution order
//!
//! ```text
//! CLI flag  >  environment variable  >  YAML config file  >  default
//! ```
//!
//! The CLI (clap, with `env` fallbacks) produces one [`ConfigLayer`], the
//! optional YAML file another; [`SyncConfig::resolve`] merges and validates
//! them. The API token is never read from the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{ApiToken, FailurePolicy, PageId};

pub const DEFAULT_IGNORE: &str = "node_modules/**";
pub const DEFAULT_DELAY_MS: u64 = 350;
pub const DEFAULT_INDEX_NAME: &str = "README";

// ---------------------------------------------------------------------------
// 1. Partial layer
// ---------------------------------------------------------------------------

/// One partially-filled configuration source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    pub folder: Option<PathBuf>,
    #[serde(skip)]
    pub token: Option<String>,
    pub root: Option<String>,
    pub base_url: Option<String>,
    pub ignore: Option<String>,
    pub policy: Option<FailurePolicy>,
    pub verbose: Option<bool>,
    pub delay_ms: Option<u64>,
    pub index_name: Option<String>,
}

impl ConfigLayer {
    /// Fill every unset field of `self` from `fallback`.
    pub fn or(self, fallback: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            folder: self.folder.or(fallback.folder),
            token: self.token.or(fallback.token),
            root: self.root.or(fallback.root),
            base_url: self.base_url.or(fallback.base_url),
            ignore: self.ignore.or(fallback.ignore),
            policy: self.policy.or(fallback.policy),
            verbose: self.verbose.or(fallback.verbose),
            delay_ms: self.delay_ms.or(fallback.delay_ms),
            index_name: self.index_name.or(fallback.index_name),
        }
    }
}

// ---------------------------------------------------------------------------
// 2. Config file
// ---------------------------------------------------------------------------

/// `<config_dir>/docsync/config.yaml` — pure, no I/O.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("docsync").join("config.yaml"))
}

/// Load a YAML config layer from `path`.
///
/// Returns `ConfigError::ConfigNotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed.
pub fn load_file_at(path: &Path) -> Result<ConfigLayer, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(ConfigLayer::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the explicitly requested file, or the default location when it exists.
pub fn load_optional(explicit: Option<&Path>) -> Result<ConfigLayer, ConfigError> {
    match explicit {
        Some(path) => load_file_at(path),
        None => match default_config_path() {
            Some(path) if path.exists() => load_file_at(&path),
            _ => Ok(ConfigLayer::default()),
        },
    }
}

// ---------------------------------------------------------------------------
// 3. Resolved config
// ---------------------------------------------------------------------------

/// Fully resolved and validated configuration for one run.
///
/// Passed explicitly into the inventory builder, reconciler and mutator.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Root of the local document tree.
    pub folder: PathBuf,
    pub token: ApiToken,
    /// Remote root container that holds one page per document.
    pub root: PageId,
    /// Base URL for rewriting relative and anchor links; no trailing slash.
    pub base_url: Option<String>,
    /// Relative paths matching this pattern are not enumerated.
    pub ignore: Pattern,
    pub policy: FailurePolicy,
    pub verbose: bool,
    /// Minimum spacing after every mutating remote call.
    pub delay: Duration,
    /// Title of the document that is always processed first.
    pub index_name: String,
}

impl SyncConfig {
    /// Merge `primary` over `fallback`, apply defaults, and validate.
    pub fn resolve(primary: ConfigLayer, fallback: ConfigLayer) -> Result<Self, ConfigError> {
        let layer = primary.or(fallback);

        let folder = layer.folder.ok_or(ConfigError::Missing {
            option: "folder",
            env: "FOLDER",
        })?;
        let token = layer
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::Missing {
                option: "token",
                env: "NOTION_TOKEN",
            })?;
        let root = layer.root.ok_or(ConfigError::Missing {
            option: "root",
            env: "NOTION_ROOT_ID",
        })?;

        if !folder.is_dir() {
            return Err(ConfigError::FolderNotFound { path: folder });
        }
        let root = PageId::parse(&root)?;

        let ignore_src = layer.ignore.unwrap_or_else(|| DEFAULT_IGNORE.to_string());
        let ignore = Pattern::new(&ignore_src).map_err(|source| ConfigError::InvalidIgnore {
            pattern: ignore_src.clone(),
            source,
        })?;

        let base_url = layer.base_url.map(validate_base_url).transpose()?;

        Ok(Self {
            folder,
            token: ApiToken::new(token),
            root,
            base_url,
            ignore,
            policy: layer.policy.unwrap_or_default(),
            verbose: layer.verbose.unwrap_or(false),
            delay: Duration::from_millis(layer.delay_ms.unwrap_or(DEFAULT_DELAY_MS)),
            index_name: layer
                .index_name
                .unwrap_or_else(|| DEFAULT_INDEX_NAME.to_string()),
        })
    }
}

fn validate_base_url(raw: String) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    let has_host = ["http://", "https://"]
        .iter()
        .any(|scheme| trimmed.len() > scheme.len() && trimmed.starts_with(scheme));
    if !has_host {
        return Err(ConfigError::InvalidBaseUrl { value: raw });
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
