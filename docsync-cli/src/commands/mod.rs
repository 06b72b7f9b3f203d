pub mod plan;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use docsync_core::{config, ConfigLayer, FailurePolicy, SyncConfig};

/// Options shared by every command that talks to the remote store.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Local folder holding the markdown documents.
    #[arg(long, env = "FOLDER")]
    pub folder: Option<PathBuf>,

    /// Integration token for the remote workspace.
    #[arg(long, env = "NOTION_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Root page id, dashed UUID, or page URL.
    #[arg(long, env = "NOTION_ROOT_ID")]
    pub root: Option<String>,

    /// Base URL that relative and anchor links are rewritten against.
    #[arg(long, env = "DOCSYNC_BASE_URL")]
    pub base_url: Option<String>,

    /// Glob of relative paths to skip [default: node_modules/**].
    #[arg(long, env = "DOCSYNC_IGNORE")]
    pub ignore: Option<String>,

    /// Per-item failure handling: ignore or strict [default: ignore].
    #[arg(long, env = "DOCSYNC_POLICY")]
    pub policy: Option<FailurePolicy>,

    /// Debug-level diagnostics.
    #[arg(short, long, env = "DOCSYNC_VERBOSE")]
    pub verbose: bool,

    /// Minimum milliseconds between mutating calls [default: 350].
    #[arg(long, env = "DOCSYNC_DELAY_MS")]
    pub delay_ms: Option<u64>,

    /// Title of the document processed first [default: README].
    #[arg(long, env = "DOCSYNC_INDEX_NAME")]
    pub index_name: Option<String>,

    /// YAML config file [default: <config_dir>/docsync/config.yaml].
    #[arg(long, env = "DOCSYNC_CONFIG")]
    pub config: Option<PathBuf>,
}

impl ConnectionArgs {
    fn layer(&self) -> ConfigLayer {
        ConfigLayer {
            folder: self.folder.clone(),
            token: self.token.clone(),
            root: self.root.clone(),
            base_url: self.base_url.clone(),
            ignore: self.ignore.clone(),
            policy: self.policy,
            verbose: self.verbose.then_some(true),
            delay_ms: self.delay_ms,
            index_name: self.index_name.clone(),
        }
    }

    /// Merge flags and environment over the config file, validate, and
    /// start logging at the resolved verbosity.
    pub fn resolve(&self) -> Result<SyncConfig> {
        let file = config::load_optional(self.config.as_deref())
            .context("failed to load config file")?;
        let resolved = SyncConfig::resolve(self.layer(), file).context("invalid configuration")?;
        init_tracing(resolved.verbose);
        tracing::debug!(
            folder = %resolved.folder.display(),
            root = %resolved.root,
            policy = %resolved.policy,
            delay_ms = resolved.delay.as_millis() as u64,
            "configuration resolved"
        );
        Ok(resolved)
    }
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `--verbose`.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
