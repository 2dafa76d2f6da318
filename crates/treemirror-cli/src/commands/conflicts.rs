//! `treemirror conflicts`

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::context::CommandContext;
use crate::output::{get_formatter, OutputFormat};

/// Mark or clear conflicts
#[derive(Debug, Subcommand)]
pub enum ConflictsCommand {
    /// Mark a cached file as conflicting with a remote version
    Mark(MarkArgs),
    /// Clear the conflict on a file
    Clear(ClearArgs),
}

#[derive(Debug, Args)]
pub struct MarkArgs {
    /// File in conflict
    pub path: String,
    /// ETag of the remote version it conflicts with
    pub etag: String,
}

#[derive(Debug, Args)]
pub struct ClearArgs {
    /// File whose conflict is resolved
    pub path: String,
}

impl ConflictsCommand {
    pub async fn execute(&self, ctx: &CommandContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let (path, marker) = match self {
            ConflictsCommand::Mark(args) => (&args.path, Some(args.etag.clone())),
            ConflictsCommand::Clear(args) => (&args.path, None),
        };
        let requested = marker.is_some();

        let node = ctx.resolve(path).await?;
        let stored = ctx
            .engine
            .conflicts()
            .set_conflict(&ctx.account, &node, marker)
            .await?;

        if format == OutputFormat::Json {
            formatter.print_json(&serde_json::json!({
                "path": node.remote_path().as_str(),
                "conflict": stored,
            }));
            return Ok(());
        }

        match stored {
            Some(marker) => formatter.success(&format!(
                "Marked {} as conflicting with {marker}",
                node.remote_path()
            )),
            None if requested => formatter.warn(&format!(
                "{} has no cached content, nothing to mark",
                node.remote_path()
            )),
            None => formatter.success(&format!("Cleared conflict on {}", node.remote_path())),
        }
        Ok(())
    }
}
