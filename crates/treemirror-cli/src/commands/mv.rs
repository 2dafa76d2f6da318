//! `treemirror mv` and `treemirror cp`

use anyhow::Result;
use clap::Args;
use treemirror_core::domain::{Node, RemotePath};

use super::{failures_json, report_local_failures};
use crate::context::CommandContext;
use crate::output::{get_formatter, OutputFormat};

/// Move or rename a file or folder
#[derive(Debug, Args)]
pub struct MvCommand {
    /// File or folder to move
    pub from: String,
    /// New path; a trailing '/' moves a file into that folder
    pub to: String,
}

impl MvCommand {
    pub async fn execute(&self, ctx: &CommandContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let node = ctx.resolve(&self.from).await?;
        let target = target_path(&node, &self.to)?;
        let parent = target
            .parent()
            .ok_or_else(|| anyhow::anyhow!("cannot move onto the root folder"))?;

        let outcome = ctx
            .engine
            .mover()
            .move_node(&ctx.account, &node, &target, &parent)
            .await?;

        if format == OutputFormat::Json {
            formatter.print_json(&serde_json::json!({
                "from": node.remote_path().as_str(),
                "to": target.as_str(),
                "moved": outcome.moved,
                "relocated": outcome.relocated.len(),
                "local_failures": failures_json(&outcome.local_failures),
            }));
            return Ok(());
        }

        if outcome.moved == 0 {
            formatter.info("Nothing to move");
        } else {
            formatter.success(&format!(
                "Moved {} to {target} ({} nodes, {} cached files)",
                node.remote_path(),
                outcome.moved,
                outcome.relocated.len()
            ));
        }
        report_local_failures(formatter.as_ref(), &outcome.local_failures);
        Ok(())
    }
}

/// Copy the cached bytes of a file to another path
#[derive(Debug, Args)]
pub struct CpCommand {
    /// Cached file to copy
    pub from: String,
    /// Path of the copy; a trailing '/' copies into that folder
    pub to: String,
}

impl CpCommand {
    pub async fn execute(&self, ctx: &CommandContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let node = ctx.resolve(&self.from).await?;
        let target = target_path(&node, &self.to)?;

        let outcome = ctx
            .engine
            .copier()
            .copy_local(&ctx.account, &node, &target)
            .await?;

        if format == OutputFormat::Json {
            formatter.print_json(&serde_json::json!({
                "from": node.remote_path().as_str(),
                "to": target.as_str(),
                "copied_to": outcome.copied_to.as_ref().map(|p| p.display().to_string()),
                "linked": outcome.linked,
                "local_failures": failures_json(&outcome.local_failures),
            }));
            return Ok(());
        }

        match &outcome.copied_to {
            Some(local) => {
                formatter.success(&format!("Copied {} to {}", node.remote_path(), local.display()));
                if !outcome.linked {
                    formatter.info(&format!("No node exists at {target} yet"));
                }
            }
            None if outcome.local_failures.is_empty() => {
                formatter.info(&format!("{} has no cached content", node.remote_path()));
            }
            None => {}
        }
        report_local_failures(formatter.as_ref(), &outcome.local_failures);
        Ok(())
    }
}

/// Turns a user-typed destination into the full path `node` should get
///
/// A folder keeps its trailing slash; a file given a folder destination
/// keeps its name.
pub fn target_path(node: &Node, raw: &str) -> Result<RemotePath> {
    let mut raw = if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/{raw}")
    };

    if node.is_folder() {
        if !raw.ends_with('/') {
            raw.push('/');
        }
    } else if raw.ends_with('/') {
        let name = node
            .remote_path()
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("{} has no name", node.remote_path()))?;
        raw.push_str(name);
    }
    Ok(RemotePath::new(raw)?)
}
