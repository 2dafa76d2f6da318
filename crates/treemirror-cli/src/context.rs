//! Shared state for commands that operate on one account

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;
use treemirror_cache::{DatabasePool, SqliteNodeStore};
use treemirror_core::config::Config;
use treemirror_core::domain::{AccountName, Node, RemotePath};
use treemirror_sync::filesystem::LocalStorageAdapter;
use treemirror_sync::media_index::TracingMediaIndex;
use treemirror_sync::MirrorEngine;

/// Opened database plus the resolved account
pub struct CommandContext {
    pub engine: MirrorEngine,
    pub account: AccountName,
    pub database: PathBuf,
}

impl CommandContext {
    /// Opens the configured database and wires the engine around it
    pub async fn open(config: &Config, account: Option<&str>) -> Result<Self> {
        let account = resolve_account(config, account)?;
        let pool = DatabasePool::new(&config.storage.database)
            .await
            .with_context(|| {
                format!(
                    "Failed to open database {}",
                    config.storage.database.display()
                )
            })?;
        let store = Arc::new(SqliteNodeStore::new(pool.pool().clone()));
        let engine = MirrorEngine::new(
            store,
            Arc::new(LocalStorageAdapter::new()),
            Arc::new(TracingMediaIndex::new()),
            config.content_layout(),
        );
        debug!(account = %account, database = %config.storage.database.display(), "engine ready");
        Ok(Self {
            engine,
            account,
            database: config.storage.database.clone(),
        })
    }

    /// Looks up the node named on the command line
    ///
    /// A folder may be named without its trailing slash.
    pub async fn resolve(&self, raw: &str) -> Result<Node> {
        for candidate in path_candidates(raw)? {
            if let Some(node) = self
                .engine
                .queries()
                .get_by_path(&self.account, &candidate)
                .await?
            {
                return Ok(node);
            }
        }
        anyhow::bail!("{raw} not found for account {}", self.account)
    }
}

/// Account from the command line, else from the configuration
pub fn resolve_account(config: &Config, flag: Option<&str>) -> Result<AccountName> {
    let name = flag
        .map(str::to_string)
        .or_else(|| config.account.default.clone())
        .context("No account given: pass --account or set account.default")?;
    Ok(AccountName::new(name)?)
}

/// Remote paths a user-typed path may refer to, most literal first
pub fn path_candidates(raw: &str) -> Result<Vec<RemotePath>> {
    let raw = if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/{raw}")
    };
    let mut candidates = vec![RemotePath::new(raw.clone())?];
    if !raw.ends_with('/') {
        candidates.push(RemotePath::new(format!("{raw}/"))?);
    }
    Ok(candidates)
}
