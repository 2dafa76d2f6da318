//! Available-offline commands: `pin`, `unpin` and `offline`

use anyhow::Result;
use clap::Args;
use treemirror_core::domain::AvailableOffline;

use crate::context::CommandContext;
use crate::output::{format_bytes, get_formatter, node_json, node_line, OutputFormat};

/// Keep a file or folder available offline
#[derive(Debug, Args)]
pub struct PinCommand {
    /// File or folder to pin
    pub path: String,
}

impl PinCommand {
    pub async fn execute(&self, ctx: &CommandContext, format: OutputFormat) -> Result<()> {
        set_status(ctx, format, &self.path, AvailableOffline::Offline).await
    }
}

/// Stop keeping a file or folder available offline
#[derive(Debug, Args)]
pub struct UnpinCommand {
    /// File or folder to unpin
    pub path: String,
}

impl UnpinCommand {
    pub async fn execute(&self, ctx: &CommandContext, format: OutputFormat) -> Result<()> {
        set_status(ctx, format, &self.path, AvailableOffline::NotOffline).await
    }
}

async fn set_status(
    ctx: &CommandContext,
    format: OutputFormat,
    path: &str,
    status: AvailableOffline,
) -> Result<()> {
    let formatter = get_formatter(format);
    let node = ctx.resolve(path).await?;
    let changed = ctx
        .engine
        .offline()
        .set_status(&ctx.account, &node, status)
        .await?;

    if format == OutputFormat::Json {
        formatter.print_json(&serde_json::json!({
            "path": node.remote_path().as_str(),
            "available_offline": status.to_string(),
            "changed": changed,
        }));
        return Ok(());
    }

    let verb = if status == AvailableOffline::Offline {
        "Pinned"
    } else {
        "Unpinned"
    };
    formatter.success(&format!("{verb} {}", node.remote_path()));
    if status == AvailableOffline::NotOffline {
        if let Some(ancestor) = ctx
            .engine
            .queries()
            .offline_ancestor(&ctx.account, &node)
            .await?
        {
            formatter.warn(&format!(
                "{} is still offline through {}",
                node.remote_path(),
                ancestor.remote_path()
            ));
        }
    }
    Ok(())
}

/// List files that should be kept cached
#[derive(Debug, Args)]
pub struct OfflineCommand {
    /// Include files of every account
    #[arg(long)]
    pub all_accounts: bool,

    /// List the pinned nodes instead of the files they cover
    #[arg(long, conflicts_with = "all_accounts")]
    pub pins: bool,
}

impl OfflineCommand {
    pub async fn execute(&self, ctx: &CommandContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let queries = ctx.engine.queries();

        let nodes = if self.pins {
            queries.pinned_nodes(&ctx.account).await?
        } else {
            let files = queries.available_offline_files().await?;
            if self.all_accounts {
                files
            } else {
                files
                    .into_iter()
                    .filter(|n| n.account() == &ctx.account)
                    .collect()
            }
        };

        if format == OutputFormat::Json {
            formatter.print_json(&serde_json::json!(nodes
                .iter()
                .map(node_json)
                .collect::<Vec<_>>()));
            return Ok(());
        }

        if nodes.is_empty() {
            formatter.info("Nothing is available offline");
            return Ok(());
        }
        let mut total = 0u64;
        let mut cached = 0usize;
        for node in &nodes {
            if self.all_accounts {
                println!("{:<12} {}", node.account(), node_line(node));
            } else {
                println!("{}", node_line(node));
            }
            total += node.size();
            cached += usize::from(node.local_path().is_some());
        }
        if !self.pins {
            formatter.info(&format!(
                "{} files, {} cached, {} total",
                nodes.len(),
                cached,
                format_bytes(total)
            ));
        }
        Ok(())
    }
}
